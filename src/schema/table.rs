//! Recording table and CSV ingestion
//!
//! A recording is a column-major table of numeric channels sharing one row
//! index. Non-numeric columns (typically the participant id) are kept as text
//! channels. Tables are never mutated once built; derived signals are returned
//! as new vectors by the computations that produce them.

use crate::error::ComputeError;
use crate::types::ParticipantId;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Elapsed-seconds channel used for duration and sampling-rate derivation
pub const TIME_CHANNEL: &str = "t_from_start";

/// Participant identifier channel of physiological tables
pub const PARTICIPANT_CHANNEL: &str = "pp";

/// Ordered, immutable table of named channels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
    text: HashMap<String, Vec<String>>,
    rows: usize,
}

impl RecordingTable {
    /// Build a table from numeric channels given in column order.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, ComputeError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = RecordingTable::default();
        let mut first = true;
        for (name, values) in columns {
            let name = name.into();
            if first {
                table.rows = values.len();
                first = false;
            } else if values.len() != table.rows {
                return Err(ComputeError::SchemaError(format!(
                    "channel {} has {} rows, expected {}",
                    name,
                    values.len(),
                    table.rows
                )));
            }
            if table.index.contains_key(&name) {
                return Err(ComputeError::SchemaError(format!(
                    "duplicate channel {}",
                    name
                )));
            }
            table.index.insert(name.clone(), table.names.len());
            table.names.push(name);
            table.columns.push(values);
        }
        Ok(table)
    }

    /// Attach a text channel (e.g. a string participant id).
    pub fn with_text_channel(
        mut self,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> Result<Self, ComputeError> {
        let name = name.into();
        if self.names.is_empty() && self.text.is_empty() {
            self.rows = values.len();
        } else if values.len() != self.rows {
            return Err(ComputeError::SchemaError(format!(
                "text channel {} has {} rows, expected {}",
                name,
                values.len(),
                self.rows
            )));
        }
        self.text.insert(name, values);
        Ok(self)
    }

    /// Read a table from CSV with a header row.
    ///
    /// Header names are trimmed (feature extractors commonly write `", AU01_r"`).
    /// Empty cells become `NaN`. A column with any non-empty, non-numeric cell is
    /// stored as a text channel.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ComputeError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for (row_num, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(ComputeError::ParseError(format!(
                    "row {} has {} fields, expected {}",
                    row_num + 1,
                    record.len(),
                    headers.len()
                )));
            }
            for (col, field) in record.iter().enumerate() {
                cells[col].push(field.to_string());
            }
        }

        let rows = cells.first().map(|c| c.len()).unwrap_or(0);
        let mut numeric = Vec::new();
        let mut text = Vec::new();
        for (name, column) in headers.into_iter().zip(cells) {
            match parse_numeric(&column) {
                Some(values) => numeric.push((name, values)),
                None => text.push((name, column)),
            }
        }

        let mut table = RecordingTable::from_columns(numeric)?;
        table.rows = rows;
        for (name, values) in text {
            table.text.insert(name, values);
        }

        debug!(
            rows = table.rows,
            numeric = table.names.len(),
            text = table.text.len(),
            "read recording table"
        );
        Ok(table)
    }

    /// Read a table from a CSV file.
    pub fn from_csv_path(path: &Path) -> Result<Self, ComputeError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Numeric channel names in table order
    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Numeric channel by exact name
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Numeric channel, or `MissingChannel`
    pub fn require(&self, name: &str) -> Result<&[f64], ComputeError> {
        self.channel(name)
            .ok_or_else(|| ComputeError::MissingChannel(name.to_string()))
    }

    /// Text channel by exact name
    pub fn text_channel(&self, name: &str) -> Option<&[String]> {
        self.text.get(name).map(|v| v.as_slice())
    }

    /// Participant id from the first row of the `pp` channel, text or numeric.
    pub fn participant(&self) -> Option<ParticipantId> {
        if let Some(values) = self.text_channel(PARTICIPANT_CHANNEL) {
            return values
                .iter()
                .find(|v| !v.trim().is_empty())
                .map(ParticipantId::new);
        }
        self.channel(PARTICIPANT_CHANNEL)
            .and_then(|values| values.first().copied())
            .and_then(ParticipantId::from_numeric)
    }

    /// New table keeping only rows where every listed channel is finite.
    ///
    /// Channels not present in the table are ignored.
    pub fn drop_missing(&self, channels: &[&str]) -> RecordingTable {
        let checked: Vec<&[f64]> = channels.iter().filter_map(|c| self.channel(c)).collect();
        let keep: Vec<usize> = (0..self.rows)
            .filter(|&row| checked.iter().all(|col| !col[row].is_nan()))
            .collect();

        RecordingTable {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| keep.iter().map(|&r| col[r]).collect())
                .collect(),
            index: self.index.clone(),
            text: self
                .text
                .iter()
                .map(|(name, col)| (name.clone(), keep.iter().map(|&r| col[r].clone()).collect()))
                .collect(),
            rows: keep.len(),
        }
    }
}

fn parse_numeric(column: &[String]) -> Option<Vec<f64>> {
    column
        .iter()
        .map(|cell| {
            if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                Some(f64::NAN)
            } else {
                cell.parse::<f64>().ok()
            }
        })
        .collect()
}
