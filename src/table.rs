//! Header-driven tables as served by the sheets API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire shape of `GET <sheet-endpoint>?range=<SheetName>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<SheetData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetData {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub major_dimension: String,
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// Row 0 of the grid split off as headers; every row is padded or truncated
/// to `headers.len()` cells so absent values are always `""`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Build from a full grid whose first row is the header row. An empty
    /// grid gives an empty table.
    pub fn from_grid(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let headers = values.remove(0);
        Self::new(headers, values)
    }

    /// Shape problems (`data` missing, no values) degrade to an empty table.
    /// `success: false` is a transport failure and is handled by the source.
    pub fn from_response(resp: SheetResponse) -> Self {
        match resp.data {
            Some(data) => Self::from_grid(data.values),
            None => Self::default(),
        }
    }

    /// True when there is no header row or no data rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self) -> ColumnIndex {
        ColumnIndex::new(&self.headers)
    }
}

/// Header name -> column position. Exact match: case and accents matter
/// (`"VEÍCULO"` is not `"VEICULO"`).
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            // first occurrence wins, like indexOf
            positions.entry(h.clone()).or_insert(i);
        }
        Self { positions }
    }

    pub fn position(&self, header: &str) -> Option<usize> {
        self.positions.get(header).copied()
    }

    /// First header of `candidates` that is present.
    pub fn position_any<S: AsRef<str>>(&self, candidates: &[S]) -> Option<usize> {
        candidates.iter().find_map(|c| self.position(c.as_ref()))
    }

    pub fn contains(&self, header: &str) -> bool {
        self.positions.contains_key(header)
    }
}

/// Cell lookup by header name. A missing column or a short row yields `""`.
pub fn cell<'a>(row: &'a [String], position: Option<usize>) -> &'a str {
    position
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn parses_wire_shape() {
        let body = r#"{
            "success": true,
            "data": {
                "range": "Consolidado",
                "majorDimension": "ROWS",
                "values": [["Date", "Campanha"], ["01/03/2025", "A"], ["02/03/2025"]]
            }
        }"#;
        let resp: SheetResponse = serde_json::from_str(body).unwrap();
        assert!(resp.success);
        let table = RawTable::from_response(resp);
        assert_eq!(table.headers, vec!["Date", "Campanha"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["02/03/2025".to_string(), String::new()]);
    }

    #[test]
    fn missing_values_give_empty_table() {
        let resp: SheetResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(RawTable::from_response(resp).is_empty());

        let only_headers = RawTable::from_grid(grid(&[&["Date"]]));
        assert!(only_headers.is_empty());
    }

    #[test]
    fn long_rows_are_truncated() {
        let t = RawTable::from_grid(grid(&[&["A"], &["1", "extra"]]));
        assert_eq!(t.rows[0], vec!["1".to_string()]);
    }

    #[test]
    fn column_lookup_is_exact() {
        let t = RawTable::from_grid(grid(&[&["VEÍCULO", "Date", "Date"], &["Meta", "x", "y"]]));
        let idx = t.column_index();
        assert_eq!(idx.position("VEÍCULO"), Some(0));
        assert_eq!(idx.position("VEICULO"), None);
        assert_eq!(idx.position("veículo"), None);
        assert_eq!(idx.position("Date"), Some(1));
        assert_eq!(idx.position_any(&["Video views", "Date"]), Some(1));
        assert_eq!(cell(&t.rows[0], idx.position("Missing")), "");
        assert_eq!(cell(&t.rows[0], idx.position("VEÍCULO")), "Meta");
    }
}
