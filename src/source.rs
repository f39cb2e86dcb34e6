use crate::{config::DEFAULT_TIMESTAMP_FIELD, metric::Row};
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("error reading csv header")]
    Header(#[source] csv::Error),
    #[error("error reading csv record {line}")]
    Record {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// Streams rows out of a CSV document with a header line.
///
/// Cells are typed on the fly: anything that parses as a number is kept,
/// blank or non-numeric cells become absent values. Short records are
/// accepted, their trailing columns are simply absent.
pub struct CsvRowReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Option<csv::StringRecord>,
    timestamp_field: String,
    record: csv::StringRecord,
    done: bool,
}

impl<R: Read> CsvRowReader<R> {
    pub fn new(readable: R) -> Self {
        Self::with_timestamp_field(readable, DEFAULT_TIMESTAMP_FIELD)
    }

    pub fn with_timestamp_field(readable: R, timestamp_field: &str) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(readable);
        Self {
            reader,
            headers: None,
            timestamp_field: timestamp_field.to_string(),
            record: csv::StringRecord::new(),
            done: false,
        }
    }

    fn decode_row(&mut self) -> Result<Option<Row>, SourceError> {
        if self.headers.is_none() {
            let headers = self.reader.headers().map_err(SourceError::Header)?;
            self.headers = Some(headers.clone());
        }
        let line = self.reader.position().line();
        let has_record = self
            .reader
            .read_record(&mut self.record)
            .map_err(|source| SourceError::Record { line, source })?;
        let headers = match (&self.headers, has_record) {
            (Some(headers), true) => headers,
            _ => return Ok(None),
        };

        let mut row = Row::default();
        for (key, cell) in headers.iter().zip(self.record.iter()) {
            let value = parse_cell(cell);
            if key == self.timestamp_field {
                row.timestamp = value;
            } else {
                row.fields.insert(key.to_string(), value);
            }
        }
        Ok(Some(row))
    }
}

impl<R: Read> Iterator for CsvRowReader<R> {
    type Item = Result<Row, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decode_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                // The underlying reader can't resync after a framing error.
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok()
}
