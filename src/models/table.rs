use crate::error::{ProcessingError, Result};

/// A parsed CSV file: header plus data rows.
///
/// Rows may be shorter (or longer) than the header; callers decide what
/// a short row means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(ProcessingError::MalformedInput(
                "CSV file is empty or has no headers".to_string(),
            ));
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first header equal to `name` (case-sensitive, untrimmed)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_index(&self.headers, name)
    }
}

pub(crate) fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_header_rejected() {
        let err = CsvTable::new(Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, ProcessingError::MalformedInput(_)));
    }

    #[test]
    fn test_column_index_first_exact_match() {
        let table = CsvTable::new(
            strings(&["avgtemperature", " AvgTemperature", "AvgTemperature", "AvgTemperature"]),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(table.column_index("AvgTemperature"), Some(2));
        assert_eq!(table.column_index("City"), None);
    }

    #[test]
    fn test_short_rows_tolerated() {
        let table = CsvTable::new(
            strings(&["Region", "AvgTemperature"]),
            vec![strings(&["Midwest"]), strings(&["Midwest", "12.0", "extra"])],
        )
        .unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0].len(), 1);
    }
}
