//! DX spot records built from [`DxLexer`] tokens.

use std::collections::HashSet;

use shack_core::{Error, Result};

use crate::dx::{DxKind, DxLexer, DxToken};

/// One spot from a DX cluster listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DxSpot {
    /// Cluster node that relayed the listing, from the closing prompt
    /// (`AD2CC de W1NR ...`).
    pub originator: Option<String>,
    /// Frequency as listed, in kHz.
    pub frequency: String,
    pub dx_call: String,
    pub date: String,
    pub time: String,
    /// Free text between the time and the spotter, untrimmed.
    pub info: String,
    pub spotter: String,
    /// Whether the operator still needs this station.
    pub needed: bool,
}

impl DxSpot {
    /// The listed frequency in kHz, if it parses.
    pub fn frequency_khz(&self) -> Option<f64> {
        self.frequency.parse().ok()
    }
}

/// Collects [`DxSpot`]s from a token stream.
///
/// Fields accumulate until a spotter token completes the record. Records
/// still incomplete when an error token arrives are dropped.
#[derive(Debug, Default)]
pub struct SpotAccumulator {
    current: DxSpot,
    spots: Vec<DxSpot>,
    done: bool,
}

impl SpotAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one token.
    ///
    /// An error token discards the partial record and is returned as
    /// [`Error::Lex`]; spots already completed are kept.
    pub fn accept(&mut self, token: &DxToken<'_>) -> Result<()> {
        let text = token.text.as_ref();
        match token.kind {
            DxKind::Frequency => self.current.frequency = text.to_string(),
            DxKind::DxCall => self.current.dx_call = text.to_string(),
            DxKind::Date => self.current.date = text.to_string(),
            DxKind::Time => self.current.time = text.to_string(),
            DxKind::Info => self.current.info = text.to_string(),
            DxKind::Spotter => {
                let mut spot = std::mem::take(&mut self.current);
                spot.spotter = text.to_string();
                self.spots.push(spot);
            }
            DxKind::End => {
                if let Some(node) = node_call(text) {
                    for spot in &mut self.spots {
                        spot.originator.get_or_insert_with(|| node.to_string());
                    }
                }
            }
            DxKind::Eof => self.done = true,
            DxKind::Begin => {}
            DxKind::Error => {
                self.current = DxSpot::default();
                self.done = true;
                return Err(Error::Lex(text.to_string()));
            }
        }
        Ok(())
    }

    /// Spots completed so far.
    pub fn spots(&self) -> &[DxSpot] {
        &self.spots
    }

    /// Whether an end-of-input or error token has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Finish, returning the completed spots. A trailing partial record is
    /// dropped.
    pub fn finish(self) -> Vec<DxSpot> {
        if self.current != DxSpot::default() {
            tracing::debug!(partial = ?self.current, "Dropping incomplete spot");
        }
        self.spots
    }
}

/// The node callsign in a prompt line `MYCALL de NODE ...`.
fn node_call(prompt: &str) -> Option<&str> {
    let mut words = prompt.split_whitespace();
    words.next()?;
    if !words.next()?.eq_ignore_ascii_case("de") {
        return None;
    }
    words.next()
}

/// Lex and accumulate a whole listing.
pub fn parse_spots(input: &str, my_call: &str) -> Result<Vec<DxSpot>> {
    let mut acc = SpotAccumulator::new();
    for token in DxLexer::new(input, my_call) {
        acc.accept(&token)?;
    }
    Ok(acc.finish())
}

/// Cross reference against the operator's contact log.
pub trait NeedLookup {
    /// Whether `dx_call` is still needed.
    fn is_needed(&self, dx_call: &str) -> bool;
}

/// Calls already worked; anything else is needed.
impl NeedLookup for HashSet<String> {
    fn is_needed(&self, dx_call: &str) -> bool {
        !self.contains(&dx_call.to_ascii_uppercase())
    }
}

impl<F> NeedLookup for F
where
    F: Fn(&str) -> bool,
{
    fn is_needed(&self, dx_call: &str) -> bool {
        self(dx_call)
    }
}

/// Set `needed` on every spot from `lookup`. Returns how many are needed.
pub fn mark_needed(spots: &mut [DxSpot], lookup: &dyn NeedLookup) -> usize {
    let mut count = 0;
    for spot in spots.iter_mut() {
        spot.needed = lookup.is_needed(&spot.dx_call);
        count += usize::from(spot.needed);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LISTING: &str = "AD2CC de W1NR 28-Jul-2023 2108Z dxspider >\n\
\n  14043.0 KE0YDN      28-Jul-2023 2100Z CW                             <KC3M>\n  \
21260.0 PR6T        28-Jul-2023 2058Z SA080 Tinhare Is.            <KA2NUE>\n  \
18069.1 OK1WQ       28-Jul-2023 1957Z Lot of CQ little listening :-(<K8WHA>\n\
AD2CC de W1NR 28-Jul-2023 2108Z dxspider >";

    #[test]
    fn scenario_single_spot() {
        let input = "... ad2cc\n  14043.0 KE0YDN      28-Jul-2023 2100Z CW <KC3M>\nad2cc de ...";
        let spots = parse_spots(input, "ad2cc").unwrap();
        assert_eq!(spots.len(), 1);
        let s = &spots[0];
        assert_eq!(s.frequency, "14043.0");
        assert_eq!(s.dx_call, "KE0YDN");
        assert_eq!(s.date, "28-Jul-2023");
        assert_eq!(s.time, "2100Z");
        assert!(s.info.contains("CW"));
        assert_eq!(s.spotter, "KC3M");
    }

    #[test]
    fn listing_records() {
        let spots = parse_spots(LISTING, "ad2cc").unwrap();
        assert_eq!(spots.len(), 3);
        assert_eq!(spots[1].info.trim(), "SA080 Tinhare Is.");
        assert_eq!(spots[2].info.trim(), "Lot of CQ little listening :-(");
        assert!(spots.iter().all(|s| s.originator.as_deref() == Some("W1NR")));
        assert_eq!(spots[1].frequency_khz(), Some(21260.0));
    }

    #[test]
    fn truncated_listing_has_no_records() {
        let mut acc = SpotAccumulator::new();
        let mut errors = Vec::new();
        for token in DxLexer::new("ad2cc\n  14043.0", "ad2cc") {
            if let Err(e) = acc.accept(&token) {
                errors.push(e.to_string());
            }
        }
        assert_eq!(errors, ["lexer error: no DX call field"]);
        assert!(acc.is_done());
        assert!(acc.finish().is_empty());
    }

    #[test]
    fn error_keeps_earlier_spots() {
        let input = "ad2cc\n 7010.0 K1ABC 1-Aug-2023 0100Z CW <N2XYZ>\n 7011.0 K2";
        let mut acc = SpotAccumulator::new();
        let result: Result<()> = DxLexer::new(input, "ad2cc").try_for_each(|t| acc.accept(&t));
        assert!(matches!(result, Err(Error::Lex(_))));
        assert_eq!(acc.spots().len(), 1);
        assert_eq!(acc.spots()[0].dx_call, "K1ABC");
        assert!(parse_spots(input, "ad2cc").is_err());
    }

    #[test]
    fn needed_marking() {
        let mut spots = parse_spots(LISTING, "ad2cc").unwrap();
        let worked: HashSet<String> = ["KE0YDN".to_string()].into_iter().collect();
        assert_eq!(mark_needed(&mut spots, &worked), 2);
        assert!(!spots[0].needed);
        assert!(spots[1].needed);

        let only_ok = |call: &str| call.starts_with("OK");
        assert_eq!(mark_needed(&mut spots, &only_ok), 1);
        assert!(spots[2].needed);
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    fn spot_line() -> impl Strategy<Value = (String, String, String, String)> {
        (
            "[1-9][0-9]{3,4}\\.[0-9]",
            "[A-Z0-9]{1,3}[0-9][A-Z]{1,3}(/[A-Z0-9]{1,3})?",
            "[A-Z0-9 ]{0,20}",
            "[A-Z0-9]{3,6}",
        )
    }

    proptest! {
        #[test]
        fn relexing_is_identical(lines in proptest::collection::vec(spot_line(), 0..8)) {
            let mut input = String::from("N0CALL de NODE 1-Jan-2024 0000Z >\n");
            for (freq, call, info, spotter) in &lines {
                input.push_str(&format!("  {freq} {call}  1-Jan-2024 1200Z {info}<{spotter}>\n"));
            }
            input.push_str("N0CALL de NODE 1-Jan-2024 0000Z >");

            let first: Vec<_> = DxLexer::new(&input, "n0call").collect();
            let second: Vec<_> = DxLexer::new(&input, "n0call").collect();
            prop_assert_eq!(&first, &second);

            let spots = parse_spots(&input, "n0call").unwrap();
            prop_assert_eq!(spots.len(), lines.len());
            for (spot, (freq, call, _, spotter)) in spots.iter().zip(&lines) {
                prop_assert_eq!(&spot.frequency, freq);
                prop_assert_eq!(&spot.dx_call, call);
                prop_assert_eq!(&spot.spotter, spotter);
            }
        }
    }
}
