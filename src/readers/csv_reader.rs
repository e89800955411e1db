use crate::error::{ProcessingError, Result};
use crate::models::CsvTable;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use encoding_rs::UTF_8;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode raw object bytes as UTF-8, failing on the first invalid sequence.
pub fn decode_utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    UTF_8
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| ProcessingError::MalformedInput("input is not valid UTF-8".to_string()))
}

/// Reads comma-separated text with a header line and ragged rows.
///
/// Blank lines are data rows with no cells, so row positions match the
/// physical records of the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableReader;

impl CsvTableReader {
    pub fn new() -> Self {
        Self
    }

    /// Open a streaming row source over decoded text: the header is read
    /// immediately, data rows are read lazily in one forward pass.
    pub fn rows<'a>(&self, text: &'a str) -> Result<CsvRows<'a>> {
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes())
            .into_records();

        let headers: Vec<String> = match records.next() {
            Some(record) => {
                let record = record.map_err(malformed)?;
                if blank_lines_before(text.as_bytes(), resume_offset(&record), true) > 0 {
                    Vec::new()
                } else {
                    cells(&record)
                }
            }
            None => Vec::new(),
        };

        if headers.is_empty() {
            return Err(ProcessingError::MalformedInput(
                "CSV file is empty or has no headers".to_string(),
            ));
        }

        Ok(CsvRows {
            text: text.as_bytes(),
            headers,
            records,
            blank_rows: 0,
            pending: None,
            exhausted: false,
        })
    }

    /// Buffer a whole table from raw bytes.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<CsvTable> {
        let text = decode_utf8(bytes)?;
        let mut rows = self.rows(&text)?;
        let headers = rows.headers().to_vec();
        let data = rows.by_ref().collect::<Result<Vec<_>>>()?;

        CsvTable::new(headers, data)
    }

    /// Buffer a whole table from a local file.
    pub fn read_path(&self, path: &Path) -> Result<CsvTable> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        self.read_bytes(&bytes)
    }
}

fn malformed(err: csv::Error) -> ProcessingError {
    ProcessingError::MalformedInput(format!("unreadable CSV: {}", err))
}

fn cells(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

/// Byte offset where the parser started looking for `record`.
fn resume_offset(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.byte() as usize)
}

fn is_line_break(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// Line terminators in a run of break bytes; `\r\n` counts once.
fn count_line_breaks(run: &[u8]) -> usize {
    let mut count = 0;
    let mut bytes = run.iter().peekable();
    while let Some(&byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&&b'\n') {
            bytes.next();
        }
        count += 1;
    }
    count
}

/// Empty lines the parser skipped on its way from `offset` to the next
/// record (or to the end of input). Unless `first_record`, the first
/// terminator in the gap ends the previous record and is not a blank line.
fn blank_lines_before(text: &[u8], offset: usize, first_record: bool) -> usize {
    let offset = offset.min(text.len());
    let start = offset
        + text[offset..]
            .iter()
            .take_while(|&&b| is_line_break(b))
            .count();
    let gap_start = text[..start]
        .iter()
        .rposition(|&b| !is_line_break(b))
        .map_or(0, |i| i + 1);

    let breaks = count_line_breaks(&text[gap_start..start]);
    if first_record {
        breaks
    } else {
        breaks.saturating_sub(1)
    }
}

/// Lazily parsed data rows following a header.
pub struct CsvRows<'a> {
    text: &'a [u8],
    headers: Vec<String>,
    records: StringRecordsIntoIter<&'a [u8]>,
    blank_rows: usize,
    pending: Option<Vec<String>>,
    exhausted: bool,
}

impl CsvRows<'_> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for CsvRows<'_> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.blank_rows > 0 {
                self.blank_rows -= 1;
                return Some(Ok(Vec::new()));
            }
            if let Some(row) = self.pending.take() {
                return Some(Ok(row));
            }
            if self.exhausted {
                return None;
            }

            match self.records.next() {
                Some(Ok(record)) => {
                    self.blank_rows =
                        blank_lines_before(self.text, resume_offset(&record), false);
                    self.pending = Some(cells(&record));
                }
                Some(Err(e)) => {
                    self.exhausted = true;
                    return Some(Err(malformed(e)));
                }
                None => {
                    self.exhausted = true;
                    self.blank_rows = blank_lines_before(self.text, self.text.len(), false);
                }
            }
        }
    }
}
