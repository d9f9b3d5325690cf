//! shack-lex: Lexers for DX-cluster spot listings and ADIF log exports.
//!
//! Both lexers walk an immutable input string with a [`Cursor`] and hand out
//! tokens lazily through [`Iterator`]: nothing is scanned ahead of what the
//! consumer pulls, and dropping the lexer early releases everything.
//!
//! - [`DxLexer`] tokenizes the text a DX-spider node returns for `show/dx`.
//!   Fields are delimited by whitespace and `<`/`>`. [`SpotAccumulator`]
//!   turns the tokens into [`DxSpot`] records.
//! - [`AdifLexer`] tokenizes ADIF (`<TAG:len>value`), trusting each tag's
//!   declared length. [`QslAccumulator`] groups fields into [`QslRecord`]s.
//!
//! # Example
//!
//! ```
//! let listing = "ad2cc de W1NR 28-Jul-2023 2108Z dxspider >\n\
//!                  14043.0 KE0YDN      28-Jul-2023 2100Z CW       <KC3M>\n\
//!                AD2CC de W1NR 28-Jul-2023 2108Z dxspider >";
//!
//! let spots = shack_lex::parse_spots(listing, "ad2cc").unwrap();
//! assert_eq!(spots.len(), 1);
//! assert_eq!(spots[0].dx_call, "KE0YDN");
//! assert_eq!(spots[0].spotter, "KC3M");
//! ```

pub mod adif;
pub mod cursor;
pub mod dx;
pub mod qsl;
pub mod spot;

use std::borrow::Cow;

pub use adif::{AdifKind, AdifLexer};
pub use cursor::Cursor;
pub use dx::{DxKind, DxLexer};
pub use qsl::{QslAccumulator, QslRecord, parse_adif};
pub use spot::{DxSpot, NeedLookup, SpotAccumulator, mark_needed, parse_spots};

/// One lexed token: what kind of field it is and its text.
///
/// Field text borrows from the input; error tokens carry an owned message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a, K> {
    pub kind: K,
    pub text: Cow<'a, str>,
}

impl<'a, K> Token<'a, K> {
    pub fn new(kind: K, text: &'a str) -> Self {
        Token {
            kind,
            text: Cow::Borrowed(text),
        }
    }

    pub fn owned(kind: K, text: String) -> Self {
        Token {
            kind,
            text: Cow::Owned(text),
        }
    }
}
