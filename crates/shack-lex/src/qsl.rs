//! QSL confirmation records built from [`AdifLexer`] tokens.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use shack_core::{Error, Result};

use crate::adif::{AdifKind, AdifLexer, AdifToken};

/// Timestamp layout LoTW uses outside RFC 3339.
const LOTW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One ADIF record: field kind to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QslRecord {
    pub fields: BTreeMap<AdifKind, String>,
}

impl QslRecord {
    pub fn get(&self, kind: AdifKind) -> Option<&str> {
        self.fields.get(&kind).map(String::as_str)
    }

    pub fn call(&self) -> Option<&str> {
        self.get(AdifKind::Call)
    }

    pub fn band(&self) -> Option<&str> {
        self.get(AdifKind::Band)
    }

    pub fn mode(&self) -> Option<&str> {
        self.get(AdifKind::Mode)
    }

    /// Whether the record says the QSL was received (`QSL_RCVD` `Y`).
    pub fn qsl_received(&self) -> bool {
        self.get(AdifKind::QslReceived)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("y"))
    }

    /// The QSO time from `APP_LoTW_QSO_TIMESTAMP`.
    pub fn qso_time(&self) -> Result<DateTime<Utc>> {
        let raw = self
            .get(AdifKind::QsoTimestamp)
            .ok_or_else(|| Error::Lex("record has no QSO timestamp".into()))?;
        parse_timestamp(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse a LoTW timestamp, either `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, LOTW_TIME_FORMAT) {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Lex(format!("bad timestamp {raw:?}: {e}")))
}

/// Groups ADIF field tokens into [`QslRecord`]s.
#[derive(Debug, Default)]
pub struct QslAccumulator {
    current: QslRecord,
    records: Vec<QslRecord>,
    done: bool,
}

impl QslAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one token. An error token is returned as [`Error::Lex`].
    pub fn accept(&mut self, token: &AdifToken<'_>) -> Result<()> {
        match token.kind {
            AdifKind::EndOfRecord => {
                let record = std::mem::take(&mut self.current);
                if !record.is_empty() {
                    self.records.push(record);
                }
            }
            AdifKind::Eof => self.done = true,
            AdifKind::Error => {
                self.current = QslRecord::default();
                self.done = true;
                return Err(Error::Lex(token.text.to_string()));
            }
            kind => {
                self.current.fields.insert(kind, token.text.to_string());
            }
        }
        Ok(())
    }

    /// Records completed so far.
    pub fn records(&self) -> &[QslRecord] {
        &self.records
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Finish, returning completed records. Fields after the last `<eor>`
    /// are dropped.
    pub fn finish(self) -> Vec<QslRecord> {
        if !self.current.is_empty() {
            tracing::debug!(fields = self.current.fields.len(), "Dropping unterminated ADIF record");
        }
        self.records
    }
}

/// Lex and accumulate a whole ADIF file.
pub fn parse_adif(input: &str) -> Result<Vec<QslRecord>> {
    let mut acc = QslAccumulator::new();
    for token in AdifLexer::new(input) {
        acc.accept(&token)?;
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;

    #[test]
    fn scenario_record() {
        let records = parse_adif("<CALL:5>AD2CC<BAND:3>20m<MODE:3>SSB<eor>").unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.fields.len(), 3);
        assert_eq!(r.call(), Some("AD2CC"));
        assert_eq!(r.band(), Some("20m"));
        assert_eq!(r.mode(), Some("SSB"));
        assert!(!r.qsl_received());
    }

    #[test]
    fn confirmations() {
        let input = "<eoh>\n\
<CALL:6>KE0YDN<BAND:3>20M<MODE:2>CW<QSL_RCVD:1>Y\
<APP_LoTW_QSO_TIMESTAMP:20>2023-07-28T21:00:00Z<eor>\n\
<CALL:4>PR6T<BAND:3>15M<MODE:3>SSB<QSL_RCVD:1>N\
<APP_LoTW_QSO_TIMESTAMP:19>2023-07-28 20:58:00<eor>\n\
<CALL:5>OK1WQ<BAND:3>";
        let records = parse_adif(input);
        // The last record runs off the end of the input.
        assert!(matches!(records, Err(Error::Lex(_))));

        let input = input.trim_end_matches("<CALL:5>OK1WQ<BAND:3>");
        let records = parse_adif(input).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].qsl_received());
        assert!(!records[1].qsl_received());

        let t = records[0].qso_time().unwrap();
        assert_eq!((t.year(), t.month(), t.day(), t.hour()), (2023, 7, 28, 21));
        let t = records[1].qso_time().unwrap();
        assert_eq!((t.hour(), t.minute()), (20, 58));
    }

    #[test]
    fn unterminated_record_dropped() {
        let records = parse_adif("<CALL:5>AD2CC<eor><CALL:4>K1AB").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn bad_timestamp() {
        let records = parse_adif("<APP_LoTW_QSO_TIMESTAMP:5>later<eor>").unwrap();
        assert!(matches!(records[0].qso_time(), Err(Error::Lex(_))));
        let records = parse_adif("<CALL:1>X<eor>").unwrap();
        assert!(records[0].qso_time().is_err());
    }

    #[test]
    fn empty_records_skipped() {
        assert!(parse_adif("<eor><eor>").unwrap().is_empty());
    }

    fn field() -> impl Strategy<Value = (AdifKind, String)> {
        (
            prop_oneof![
                Just(AdifKind::Call),
                Just(AdifKind::Band),
                Just(AdifKind::Mode),
                Just(AdifKind::QslReceived),
            ],
            "[ -~]{0,16}",
        )
    }

    proptest! {
        #[test]
        fn length_prefixed_values_survive_any_text(
            records in proptest::collection::vec(proptest::collection::vec(field(), 1..5), 0..6)
        ) {
            let mut input = String::from("header text <eoh>\n");
            let mut expected = Vec::new();
            for fields in &records {
                let mut record = QslRecord::default();
                for (kind, value) in fields {
                    let tag = kind.tag().unwrap();
                    input.push_str(&format!("<{tag}:{}>{value}\n", value.len()));
                    record.fields.insert(*kind, value.clone());
                }
                input.push_str("<eor>\n");
                expected.push(record);
            }

            let first = parse_adif(&input).unwrap();
            let second = parse_adif(&input).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first, expected);
        }
    }
}
