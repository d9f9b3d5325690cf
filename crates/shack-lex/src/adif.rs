//! ADIF lexer.
//!
//! ADIF fields are length-prefixed, so values are never scanned for a
//! terminator:
//!
//! ```text
//! <CALL:5>AD2CC<BAND:3>20m<QSL_RCVD:1:S>Y<eor>
//! ```
//!
//! The lexer reports the fields a LoTW confirmation export carries; any
//! other tag is skipped by its declared length. `<eor>` and `<APP_LoTW_EOF>`
//! carry no length.

use std::collections::VecDeque;

use crate::Token;
use crate::cursor::Cursor;

/// Kinds of ADIF token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdifKind {
    Call,
    Band,
    Mode,
    /// `APP_LoTW_QSO_TIMESTAMP`
    QsoTimestamp,
    /// `QSL_RCVD`
    QslReceived,
    /// `APP_LoTW_RXQSO`
    RxQso,
    /// `APP_LoTW_RXQSL`
    RxQsl,
    EndOfRecord,
    Eof,
    Error,
}

/// An ADIF token.
pub type AdifToken<'a> = Token<'a, AdifKind>;

/// Recognised tag names (matched ignoring case) and their kinds.
const TAGS: [(&str, AdifKind); 9] = [
    ("CALL", AdifKind::Call),
    ("BAND", AdifKind::Band),
    ("MODE", AdifKind::Mode),
    ("APP_LOTW_QSO_TIMESTAMP", AdifKind::QsoTimestamp),
    ("QSL_RCVD", AdifKind::QslReceived),
    ("APP_LOTW_RXQSO", AdifKind::RxQso),
    ("APP_LOTW_RXQSL", AdifKind::RxQsl),
    ("EOR", AdifKind::EndOfRecord),
    ("APP_LOTW_EOF", AdifKind::Eof),
];

impl AdifKind {
    /// Kind for a tag name, if it is one the lexer reports.
    pub fn from_tag(name: &str) -> Option<AdifKind> {
        TAGS.iter()
            .find(|(tag, _)| tag.eq_ignore_ascii_case(name))
            .map(|&(_, kind)| kind)
    }

    /// Canonical tag name.
    pub fn tag(&self) -> Option<&'static str> {
        TAGS.iter().find(|(_, k)| k == self).map(|&(tag, _)| tag)
    }

    /// Whether tokens of this kind carry a field value.
    pub fn is_field(&self) -> bool {
        !matches!(self, AdifKind::EndOfRecord | AdifKind::Eof | AdifKind::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Free text between tags.
    Text,
    /// After `<`.
    Tag,
    /// Value of `len` bytes; `kind` is `None` for skipped tags.
    Value { kind: Option<AdifKind>, len: usize },
    Done,
}

/// Lazy tokenizer for ADIF text.
///
/// ```
/// use shack_lex::{AdifKind, AdifLexer};
///
/// let tokens: Vec<_> = AdifLexer::new("<CALL:5>AD2CC<eor>").collect();
/// assert_eq!(tokens[0].kind, AdifKind::Call);
/// assert_eq!(tokens[0].text, "AD2CC");
/// assert_eq!(tokens[1].kind, AdifKind::EndOfRecord);
/// ```
#[derive(Debug, Clone)]
pub struct AdifLexer<'a> {
    cursor: Cursor<'a>,
    state: State,
    queue: VecDeque<AdifToken<'a>>,
}

impl<'a> AdifLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        AdifLexer {
            cursor: Cursor::new(input),
            state: State::Text,
            queue: VecDeque::new(),
        }
    }

    fn error(&mut self, message: &str) -> State {
        tracing::debug!(pos = self.cursor.pos(), error = message, "ADIF lex error");
        self.queue
            .push_back(Token::owned(AdifKind::Error, message.to_string()));
        State::Done
    }

    fn step(&mut self) -> State {
        match self.state {
            State::Text => self.text(),
            State::Tag => self.tag(),
            State::Value { kind, len } => self.value(kind, len),
            State::Done => State::Done,
        }
    }

    fn text(&mut self) -> State {
        self.cursor.eat_while(|c| c != '<');
        self.cursor.ignore();
        if self.cursor.bump().is_none() {
            self.queue.push_back(Token::new(AdifKind::Eof, ""));
            return State::Done;
        }
        self.cursor.ignore();
        State::Tag
    }

    fn tag(&mut self) -> State {
        self.cursor.eat_while(|c| c != ':' && c != '>');
        let name = self.cursor.take();
        let kind = AdifKind::from_tag(name);
        match self.cursor.bump() {
            None => self.error("unterminated tag"),
            Some('>') => {
                self.cursor.ignore();
                match kind {
                    Some(AdifKind::EndOfRecord) => {
                        self.queue.push_back(Token::new(AdifKind::EndOfRecord, ""));
                        State::Text
                    }
                    Some(AdifKind::Eof) => {
                        self.queue.push_back(Token::new(AdifKind::Eof, ""));
                        State::Done
                    }
                    _ => {
                        tracing::trace!(tag = name, "Skipping tag without length");
                        State::Text
                    }
                }
            }
            Some(_) => self.length(kind, name),
        }
    }

    /// Read `len[:type]>` after the colon.
    fn length(&mut self, kind: Option<AdifKind>, name: &str) -> State {
        self.cursor.ignore();
        self.cursor.eat_while(|c| c != ':' && c != '>');
        let digits = self.cursor.take();
        let Some(delim) = self.cursor.bump() else {
            return self.error("unterminated tag");
        };
        let len = match digits.trim().parse::<usize>() {
            Ok(len) if digits.trim().bytes().all(|b| b.is_ascii_digit()) => len,
            _ => return self.error(&format!("malformed length {digits:?} in tag {name}")),
        };
        if delim == ':' {
            // Data type indicator.
            self.cursor.eat_while(|c| c != '>');
            if self.cursor.bump().is_none() {
                return self.error("unterminated tag");
            }
        }
        self.cursor.ignore();
        match kind {
            Some(AdifKind::EndOfRecord) => {
                self.queue.push_back(Token::new(AdifKind::EndOfRecord, ""));
                State::Text
            }
            Some(AdifKind::Eof) => {
                self.queue.push_back(Token::new(AdifKind::Eof, ""));
                State::Done
            }
            _ => State::Value { kind, len },
        }
    }

    fn value(&mut self, kind: Option<AdifKind>, len: usize) -> State {
        if !self.cursor.advance(len) {
            let past_end = self.cursor.pos().saturating_add(len) > self.cursor.input().len();
            return if past_end {
                self.error("field value runs past end of input")
            } else {
                self.error("field value splits a multi-byte character")
            };
        }
        let text = self.cursor.take();
        if let Some(kind) = kind {
            self.queue.push_back(Token::new(kind, text));
        }
        State::Text
    }
}

impl<'a> Iterator for AdifLexer<'a> {
    type Item = AdifToken<'a>;

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
