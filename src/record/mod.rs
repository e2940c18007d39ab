//! Bet records and the sources that produce them.

mod source;

pub use source::CsvSource;

use crate::error::Result;

/// Field separator in the serialized form; doubles as the record
/// terminator, so records concatenate with no extra delimiter.
pub const FIELD_SEPARATOR: char = ';';

/// A single bet: six fields in a fixed order.
///
/// Field content must not contain the separator character; the source does
/// not escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    /// Agency the bet was placed through.
    pub agency_id: String,
    /// Bettor's first name.
    pub first_name: String,
    /// Bettor's last name.
    pub last_name: String,
    /// National id, numeric-looking but treated as text.
    pub national_id: String,
    /// Birth date, ISO-like, treated as text.
    pub birth_date: String,
    /// The number played, treated as text.
    pub number: String,
}

impl Bet {
    /// Serialize to the batch text form: the six fields joined by `;`,
    /// with a trailing `;`.
    pub fn serialize(&self) -> String {
        format!(
            "{};{};{};{};{};{};",
            self.agency_id,
            self.first_name,
            self.last_name,
            self.national_id,
            self.birth_date,
            self.number,
        )
    }
}

/// A pull-based source of bet records.
///
/// Stateful across calls: each `next` consumes one record. The sequence is
/// finite and ends with `None`.
pub trait RecordSource {
    /// Return the next record, or `None` once the source is exhausted.
    fn next(&mut self) -> Result<Option<Bet>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bet {
        Bet {
            agency_id: "1".to_string(),
            first_name: "Santiago Lionel".to_string(),
            last_name: "Lorca".to_string(),
            national_id: "30904465".to_string(),
            birth_date: "1999-03-17".to_string(),
            number: "7574".to_string(),
        }
    }

    #[test]
    fn test_serialize_joins_fields_with_trailing_separator() {
        assert_eq!(
            sample().serialize(),
            "1;Santiago Lionel;Lorca;30904465;1999-03-17;7574;"
        );
    }

    #[test]
    fn test_serialized_records_concatenate_cleanly() {
        let one = sample().serialize();
        let two = format!("{}{}", one, one);
        // The trailing separator is the only boundary between records.
        assert_eq!(two.matches(FIELD_SEPARATOR).count(), 12);
    }
}
