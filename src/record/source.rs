//! CSV-backed record source.
//!
//! Reads an agency's bet file sequentially: five columns per row (first
//! name, last name, national id, birth date, number). The agency id is not
//! stored per row; it is supplied at open and stamped onto every record.

use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use super::{Bet, RecordSource};
use crate::error::{BetwireError, Result};

/// Columns a row in the source file must have.
const FILE_FIELD_COUNT: usize = 5;

/// Sequential reader of bet records from a CSV file.
pub struct CsvSource {
    reader: Option<Reader<File>>,
    agency_id: String,
    line: u64,
}

impl CsvSource {
    /// Open the file for sequential record access.
    pub fn open(path: impl AsRef<Path>, agency_id: &str) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        Ok(Self {
            reader: Some(reader),
            agency_id: agency_id.to_string(),
            line: 0,
        })
    }

    /// Release the file handle. Safe to call when already closed.
    pub fn close(&mut self) {
        self.reader = None;
    }
}

impl RecordSource for CsvSource {
    /// Return the next record, closing the file once it is exhausted.
    ///
    /// A row that does not parse, or does not have exactly five fields, is
    /// a hard error: the session promised to deliver every record, so none
    /// may be dropped on the way.
    fn next(&mut self) -> Result<Option<Bet>> {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Ok(None),
        };

        let mut row = StringRecord::new();
        if !reader.read_record(&mut row)? {
            self.close();
            return Ok(None);
        }
        self.line += 1;

        if row.len() != FILE_FIELD_COUNT {
            return Err(BetwireError::MalformedRecord {
                line: self.line,
                expected: FILE_FIELD_COUNT,
                got: row.len(),
            });
        }

        Ok(Some(Bet {
            agency_id: self.agency_id.clone(),
            first_name: row[0].to_string(),
            last_name: row[1].to_string(),
            national_id: row[2].to_string(),
            birth_date: row[3].to_string(),
            number: row[4].to_string(),
        }))
    }
}
