//! # Results tabulation
//!
//! Named per-cell columns of the converged kiln state. Columns spanning the
//! whole coordinate array have `n_cells + 2` rows; cell-based quantities
//! are wrapped with NaN at the kiln ends before insertion, so every column
//! has the same length. The table is built exactly once after the outer
//! loop exits and is read-only afterwards.

use crate::Kiln::rotary_kiln::KilnError;
use prettytable::{Cell, Row, Table};
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a full-length column.
    pub fn push(&mut self, name: &str, values: Vec<f64>) {
        self.columns.push((name.to_string(), values));
    }

    /// Append a cell-based column, wrapping it with NaN at both kiln ends.
    pub fn push_cell_based(&mut self, name: &str, values: &[f64]) {
        let mut wrapped = Vec::with_capacity(values.len() + 2);
        wrapped.push(f64::NAN);
        wrapped.extend_from_slice(values);
        wrapped.push(f64::NAN);
        self.columns.push((name.to_string(), wrapped));
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|(_, v)| v.len()).unwrap_or(0)
    }

    /// Interior (cell) rows of a column, skipping the kiln end rows.
    pub fn cells(&self, name: &str) -> Option<&[f64]> {
        self.get(name).map(|v| &v[1..v.len() - 1])
    }

    /// Print the selected columns to the console.
    pub fn pretty_print(&self, names: &[&str]) {
        let mut table = Table::new();
        table.add_row(Row::new(
            names.iter().map(|n| Cell::new(n)).collect::<Vec<Cell>>(),
        ));
        for row in 0..self.n_rows() {
            let cells = names
                .iter()
                .map(|n| {
                    let text = match self.get(n) {
                        Some(col) => format!("{:.5}", col[row]),
                        None => "-".to_string(),
                    };
                    Cell::new(&text)
                })
                .collect::<Vec<Cell>>();
            table.add_row(Row::new(cells));
        }
        table.printstd();
    }

    /// Dump all columns as CSV for downstream post-processing.
    pub fn save_csv(&self, path: &std::path::Path) -> Result<(), KilnError> {
        let mut file = std::fs::File::create(path)?;
        let header = self
            .columns
            .iter()
            .map(|(n, _)| n.clone())
            .collect::<Vec<String>>()
            .join(",");
        writeln!(file, "{}", header)?;
        for row in 0..self.n_rows() {
            let line = self
                .columns
                .iter()
                .map(|(_, v)| format!("{:.10e}", v[row]))
                .collect::<Vec<String>>()
                .join(",");
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cell_based_wrapping() {
        let mut table = ResultsTable::new();
        table.push("z", vec![0.0, 1.0, 3.0, 4.0]);
        table.push_cell_based("q", &[10.0, 20.0]);

        assert_eq!(table.n_rows(), 4);
        let q = table.get("q").unwrap();
        assert!(q[0].is_nan() && q[3].is_nan());
        assert_relative_eq!(q[1], 10.0);
        assert_eq!(table.cells("q").unwrap(), &[10.0, 20.0]);
    }

    #[test]
    fn test_csv_roundtrip() {
        let mut table = ResultsTable::new();
        table.push("z", vec![0.0, 1.0]);
        table.push("T", vec![300.0, 400.0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        table.save_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "z,T");
        assert!(lines.next().unwrap().starts_with("0.0"));
    }
}
