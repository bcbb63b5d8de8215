//! Reading employee rosters from delimited text files.
//!
//! A roster is a table with one employee per row. Headers are matched case-insensitively, so the
//! `Housing` and `Transport` spellings used by existing spreadsheets work unchanged. Only `.csv`
//! and `.tsv` files are supported; anything else is rejected before any row is read.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::fields::{self, normalize_key, FieldMap};

/// Columns every roster must provide.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    fields::EMPLOYEE_NAME,
    fields::EMPLOYEE_ID,
    fields::BASIC_PAY,
    fields::HOUSING,
    fields::TRANSPORT,
    fields::OTHER_ALLOWANCES,
    fields::TAX,
    fields::EMPLOYEE_PENSION,
    fields::OTHER_DEDUCTIONS,
];

/// Errors raised while opening or reading a roster.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("unsupported roster format '{extension}'; supply a .csv or .tsv file")]
    UnsupportedFormat { extension: String },
    #[error("roster is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("failed to read roster row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to open roster: {0}")]
    Io(#[from] std::io::Error),
}

/// Delimited formats the reader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    Tsv,
}

impl RosterFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let extension = path
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            _ => Err(RosterError::UnsupportedFormat { extension }),
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
        }
    }
}

/// One data row of a roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterRow {
    /// 1-based line number in the source, when known.
    pub line: Option<u64>,
    pub fields: FieldMap,
}

impl RosterRow {
    /// The recipient address for delivery, if the row has one.
    pub fn email(&self) -> Option<&str> {
        self.fields.non_empty(fields::EMAIL)
    }
}

/// Reads roster rows from any `Read` source.
pub struct RosterReader<R: Read> {
    reader: csv::Reader<R>,
}

impl RosterReader<File> {
    /// Opens the roster at `path`, choosing the format from its extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let path = path.as_ref();
        let format = RosterFormat::from_path(path)?;
        let file = File::open(path)?;
        Ok(Self::new(file, format))
    }
}

impl<R: Read> RosterReader<R> {
    /// Creates a reader over `source`. Cells are trimmed and short rows are allowed.
    pub fn new(source: R, format: RosterFormat) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter())
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Validates the header row and returns an iterator over the data rows.
    ///
    /// A row that cannot be decoded yields an `Err` for that row only; iteration continues with
    /// the next one.
    pub fn rows(mut self) -> Result<impl Iterator<Item = Result<RosterRow, RosterError>>, RosterError> {
        let headers: Vec<String> = self
            .reader
            .headers()?
            .iter()
            .map(normalize_key)
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|header| header == *column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RosterError::MissingColumns(missing));
        }

        Ok(self.reader.into_records().map(move |result| {
            let record = result?;
            let line = record.position().map(|position| position.line());
            let fields = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.as_str(), value))
                .collect();
            Ok(RosterRow { line, fields })
        }))
    }
}
