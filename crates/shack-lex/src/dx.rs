//! DX-spider spot listing lexer.
//!
//! A `show/dx` reply looks like:
//!
//! ```text
//! AD2CC de W1NR 28-Jul-2023 2108Z dxspider >
//!
//!   14043.0 KE0YDN      28-Jul-2023 2100Z CW                             <KC3M>
//!   21260.0 PR6T        28-Jul-2023 2058Z SA080 Tinhare Is.            <KA2NUE>
//! AD2CC de W1NR 28-Jul-2023 2108Z dxspider >
//! ```
//!
//! The operator's own callsign opens the listing (the prompt line) and
//! closes it (the next prompt). Each line between is one spot:
//!
//! ```text
//! LineStart -> Frequency -> BeforeCall -> DxCall -> BeforeDate -> Date
//!           -> BeforeTime -> Time -> Info -> Spotter -> LineStart
//! ```
//!
//! Every field state emits exactly one token. A field that runs into end of
//! input or a newline before its successor begins produces an error token
//! naming the missing field, and the lexer stops.

use std::collections::VecDeque;

use crate::Token;
use crate::cursor::Cursor;

/// Kinds of DX listing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxKind {
    /// Text before the opening prompt.
    Begin,
    Frequency,
    DxCall,
    Date,
    Time,
    /// Free text between the time and the spotter.
    Info,
    /// Spotter callsign, without the angle brackets.
    Spotter,
    /// The prompt line that closes the listing.
    End,
    Eof,
    Error,
}

/// A DX listing token.
pub type DxToken<'a> = Token<'a, DxKind>;

/// One spot field: which token it produces, which characters it may hold,
/// and its name for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Frequency,
    DxCall,
    Date,
    Time,
}

impl Field {
    fn kind(self) -> DxKind {
        match self {
            Field::Frequency => DxKind::Frequency,
            Field::DxCall => DxKind::DxCall,
            Field::Date => DxKind::Date,
            Field::Time => DxKind::Time,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Frequency => "frequency",
            Field::DxCall => "DX call",
            Field::Date => "date",
            Field::Time => "time",
        }
    }

    fn accepts(self, c: char) -> bool {
        match self {
            Field::Frequency => c.is_ascii_digit() || c == '.',
            Field::DxCall => c.is_alphanumeric() || c == '/',
            Field::Date => c.is_alphanumeric() || c == '-',
            Field::Time => c.is_ascii_digit() || c == 'Z',
        }
    }

    /// State after this field's run ends.
    fn after(self) -> State {
        match self {
            Field::Frequency => State::Before(Field::DxCall),
            Field::DxCall => State::Before(Field::Date),
            Field::Date => State::Before(Field::Time),
            Field::Time => State::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the opening prompt.
    Marker,
    /// Between spot lines.
    LineStart,
    /// Skipping blanks up to a field.
    Before(Field),
    /// Inside a field run.
    Run(Field),
    Info,
    Spotter,
    Done,
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

/// Lazy tokenizer for a DX-spider spot listing.
///
/// ```
/// use shack_lex::{DxKind, DxLexer};
///
/// let kinds: Vec<DxKind> = DxLexer::new("ad2cc >\n 7010.0 K1ABC 1-Aug-2023 0100Z CW <N2XYZ>\n", "ad2cc")
///     .map(|t| t.kind)
///     .collect();
/// assert_eq!(kinds.first(), Some(&DxKind::Frequency));
/// assert_eq!(kinds.last(), Some(&DxKind::Eof));
/// ```
#[derive(Debug, Clone)]
pub struct DxLexer<'a> {
    cursor: Cursor<'a>,
    my_call: &'a str,
    state: State,
    queue: VecDeque<DxToken<'a>>,
}

impl<'a> DxLexer<'a> {
    /// Lex `input`, using `my_call` (the operator's callsign, any case) as
    /// the start and end marker.
    pub fn new(input: &'a str, my_call: &'a str) -> Self {
        DxLexer {
            cursor: Cursor::new(input),
            my_call,
            state: State::Marker,
            queue: VecDeque::new(),
        }
    }

    fn emit(&mut self, kind: DxKind) {
        let text = self.cursor.take();
        self.queue.push_back(Token::new(kind, text));
    }

    fn error(&mut self, message: String) -> State {
        tracing::debug!(pos = self.cursor.pos(), error = %message, "DX listing lex error");
        self.queue.push_back(Token::owned(DxKind::Error, message));
        State::Done
    }

    fn eof(&mut self) -> State {
        self.cursor.ignore();
        self.queue.push_back(Token::new(DxKind::Eof, ""));
        State::Done
    }

    /// Run one state, returning the next.
    fn step(&mut self) -> State {
        match self.state {
            State::Marker => self.marker(),
            State::LineStart => self.line_start(),
            State::Before(field) => self.before(field),
            State::Run(field) => self.run(field),
            State::Info => self.info(),
            State::Spotter => self.spotter(),
            State::Done => State::Done,
        }
    }

    fn marker(&mut self) -> State {
        if self.my_call.is_empty() || !self.cursor.seek_ignore_case(self.my_call) {
            return self.eof();
        }
        if !self.cursor.pending().is_empty() {
            self.emit(DxKind::Begin);
        }
        // The prompt carries a date and time of its own; none of it is a spot.
        self.cursor.skip_line();
        State::LineStart
    }

    fn line_start(&mut self) -> State {
        self.cursor.eat_while(|c| is_blank(c) || c == '\n');
        self.cursor.ignore();
        if self.cursor.is_eof() {
            return self.eof();
        }
        if self.cursor.at_ignore_case(self.my_call) {
            self.cursor.eat_while(|c| c != '\n');
            let line = self.cursor.take().trim_end_matches('\r');
            self.queue.push_back(Token::new(DxKind::End, line));
            return self.eof();
        }
        match self.cursor.peek() {
            Some(c) if Field::Frequency.accepts(c) => State::Run(Field::Frequency),
            _ => self.error("no frequency field".into()),
        }
    }

    fn before(&mut self, field: Field) -> State {
        self.cursor.eat_while(is_blank);
        self.cursor.ignore();
        match self.cursor.peek() {
            None | Some('\n') => self.error(format!("no {} field", field.name())),
            Some(c) if field.accepts(c) => State::Run(field),
            Some(c) => self.error(format!("bad character {c:?} in {} field", field.name())),
        }
    }

    fn run(&mut self, field: Field) -> State {
        self.cursor.eat_while(|c| field.accepts(c));
        match self.cursor.peek() {
            None | Some('\n') => {
                self.emit(field.kind());
                field.after()
            }
            Some(c) if is_blank(c) => {
                self.emit(field.kind());
                field.after()
            }
            Some(c) => self.error(format!("bad character {c:?} in {} field", field.name())),
        }
    }

    fn info(&mut self) -> State {
        self.cursor.eat_while(|c| c != '<' && c != '\n');
        match self.cursor.peek() {
            Some('<') => {
                self.emit(DxKind::Info);
                self.cursor.bump();
                self.cursor.ignore();
                State::Spotter
            }
            _ => self.error("no spotter field".into()),
        }
    }

    fn spotter(&mut self) -> State {
        self.cursor.eat_while(|c| c != '>' && c != '\n');
        match self.cursor.peek() {
            Some('>') => {
                self.emit(DxKind::Spotter);
                self.cursor.bump();
                self.cursor.ignore();
                State::LineStart
            }
            _ => self.error("no spotter field".into()),
        }
    }
}

impl<'a> Iterator for DxLexer<'a> {
    type Item = DxToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            if self.state == State::Done {
                return None;
            }
            self.state = self.step();
        }
    }
}
