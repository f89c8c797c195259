//! CSV parser for survey exports.

use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use tracing::debug;

use crate::error::Result;

/// A survey export held as raw text cells, one row per respondent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SurveyTable {
    /// Position of `name` in the header.
    ///
    /// Survey exports often carry trailing whitespace in question labels, so an
    /// exact match is tried first and a whitespace-trimmed match second.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.trim() == name.trim()))
    }

    /// Cell at (`row`, `col`), empty when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decodes a delimited-text survey export with a header row.
///
/// Rows shorter than the header are padded with empty cells.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CSV.
pub fn parse_survey<R: Read>(reader: R) -> Result<SurveyTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len().max(row.len()), String::new());
        rows.push(row);
    }

    debug!(columns = headers.len(), rows = rows.len(), "Survey parsed");
    Ok(SurveyTable { headers, rows })
}

/// Opens and parses the survey file at `path`.
pub fn load_survey(path: &str) -> Result<SurveyTable> {
    let file = File::open(path)?;
    parse_survey(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers_and_rows() {
        let data = "Q136,free_1,Year\n2,5,Senior\n1,3,Junior\n";
        let table = parse_survey(data.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["Q136", "free_1", "Year"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 2), "Junior");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let data = "a,b,c\n1\n";
        let table = parse_survey(data.as_bytes()).unwrap();

        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.cell(0, 2), "");
    }

    #[test]
    fn test_column_index_falls_back_to_trimmed_name() {
        let data = "Year,Days on Campus \n";
        let table = parse_survey(data.as_bytes()).unwrap();

        assert_eq!(table.column_index("Year"), Some(0));
        assert_eq!(table.column_index("Days on Campus "), Some(1));
        assert_eq!(table.column_index("Days on Campus"), Some(1));
        assert_eq!(table.column_index("Gender"), None);
    }

    #[test]
    fn test_empty_input_has_no_rows() {
        let table = parse_survey("".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(table.headers.is_empty());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_survey("/nonexistent/ridership_survey.csv").is_err());
    }
}
