use std::io::Read;

/// A comma-delimited table read back without any schema, as produced by the
/// CSV exports.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlatTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column; `None` when the header is absent.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Numeric view of one column; blank or non-numeric cells are `None`.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let cells = self.column(name)?;
        Some(cells.into_iter().map(|c| c.trim().parse().ok()).collect())
    }
}

pub fn read_flat_table<R: Read>(reader: R) -> Result<FlatTable, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(FlatTable { headers, rows })
}
