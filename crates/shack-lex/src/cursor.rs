//! Cursor over an immutable input string.
//!
//! `start` marks the beginning of the pending token, `pos` the next
//! character to read. `start <= pos <= input.len()` always holds, and both
//! sit on character boundaries.

/// Read position into a lexer's input.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    start: usize,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Cursor {
            input,
            start: 0,
            pos: 0,
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Unread input.
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Text of the pending token.
    pub fn pending(&self) -> &'a str {
        &self.input[self.start..self.pos]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Read one character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Read characters while `pred` holds.
    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    /// Whether the unread input starts with `prefix`, ignoring ASCII case.
    pub fn at_ignore_case(&self, prefix: &str) -> bool {
        self.rest()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }

    /// Advance `n` bytes. Returns `false`, without moving, when that would
    /// run past the end or split a character.
    pub fn advance(&mut self, n: usize) -> bool {
        let Some(end) = self.pos.checked_add(n) else {
            return false;
        };
        if end > self.input.len() || !self.input.is_char_boundary(end) {
            return false;
        }
        self.pos = end;
        true
    }

    /// Drop the pending text.
    pub fn ignore(&mut self) {
        self.start = self.pos;
    }

    /// Take the pending text, starting a new token.
    pub fn take(&mut self) -> &'a str {
        let text = self.pending();
        self.start = self.pos;
        text
    }

    /// Move to just past the next newline, or to the end of input.
    pub fn skip_line(&mut self) {
        match self.rest().find('\n') {
            Some(i) => self.pos += i + 1,
            None => self.pos = self.input.len(),
        }
        self.start = self.pos;
    }

    /// Move to the next occurrence of `needle` (ASCII case-insensitive).
    /// Returns `false` and stays put when there is none.
    pub fn seek_ignore_case(&mut self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let hay = self.rest().as_bytes();
        let found = hay
            .windows(needle.len())
            .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()));
        match found {
            Some(i) => {
                self.pos += i;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_resets_start() {
        let mut c = Cursor::new("14043.0 KE0YDN");
        c.eat_while(|ch| ch.is_ascii_digit() || ch == '.');
        assert_eq!(c.take(), "14043.0");
        assert_eq!(c.start(), c.pos());
        c.bump();
        c.ignore();
        c.eat_while(char::is_alphanumeric);
        assert_eq!(c.take(), "KE0YDN");
        assert!(c.is_eof());
        assert_eq!(c.bump(), None);
    }

    #[test]
    fn advance_respects_boundaries() {
        let mut c = Cursor::new("aé");
        assert!(c.advance(1));
        // 'é' is two bytes.
        assert!(!c.advance(1));
        assert!(!c.advance(3));
        assert!(c.advance(2));
        assert!(c.is_eof());
    }

    #[test]
    fn seek_and_skip_line() {
        let mut c = Cursor::new("show/dx\nAD2CC de W1NR >\n  14043.0");
        assert!(c.seek_ignore_case("ad2cc"));
        assert!(c.at_ignore_case("AD2CC"));
        assert_eq!(c.pending(), "show/dx\n");
        c.ignore();
        c.skip_line();
        assert_eq!(c.rest(), "  14043.0");
        assert!(!c.seek_ignore_case("ad2cc"));
    }
}
