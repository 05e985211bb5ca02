//! Source columns and the event table they live in.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::dtype::{DType, ScalarType};
use crate::error::{FrameError, Result};
use crate::value::{Element, Scalar, Seq, Value};

/// Variable-length column: flat values plus entry boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Jagged {
    /// Flat array of all values across all entries.
    pub flat: Seq,
    /// Entry boundaries: `offsets.len() == n_entries + 1`.
    pub offsets: Vec<usize>,
}

impl Jagged {
    /// Build from per-entry sequences of element type `ty`.
    pub fn from_rows(ty: ScalarType, rows: impl IntoIterator<Item = Vec<Scalar>>) -> Self {
        let mut flat = Seq::with_capacity(ty, 0);
        let mut offsets = vec![0];
        for row in rows {
            for s in row {
                flat.push(s);
            }
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// Number of entries.
    pub fn n_entries(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Copy of entry `row`.
    pub fn row(&self, row: usize) -> Option<Seq> {
        let start = *self.offsets.get(row)?;
        let end = *self.offsets.get(row + 1)?;
        Some(self.flat.slice(start, end))
    }
}

/// One source column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// One scalar per row, stored as a typed vector.
    Scalar(Seq),
    /// One sequence per row.
    Jagged(Jagged),
}

impl Column {
    /// Jagged column from per-row vectors.
    pub fn jagged<T: Element>(rows: Vec<Vec<T>>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        let mut flat = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        for row in rows {
            flat.extend(row);
            offsets.push(flat.len());
        }
        Column::Jagged(Jagged { flat: T::into_seq(flat), offsets })
    }

    /// Column type.
    pub fn dtype(&self) -> DType {
        match self {
            Column::Scalar(s) => DType::Scalar(s.elem_type()),
            Column::Jagged(j) => DType::Seq(j.flat.elem_type()),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Scalar(s) => s.len(),
            Column::Jagged(j) => j.n_entries(),
        }
    }

    /// `true` when the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `row`, `None` past the end.
    pub fn value_at(&self, row: usize) -> Option<Value> {
        match self {
            Column::Scalar(s) => s.get(row).map(Value::Scalar),
            Column::Jagged(j) => j.row(row).map(Value::Seq),
        }
    }
}

impl<T: Element> From<Vec<T>> for Column {
    fn from(v: Vec<T>) -> Self {
        Column::Scalar(T::into_seq(v))
    }
}

/// Named source columns of equal row count.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl EventTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`EventTable::add_column`].
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.add_column(name, column)?;
        Ok(self)
    }

    /// Add a column. Names must be unique and every column must have the
    /// row count of the first one.
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first()
            && first.len() != column.len()
        {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: first.len(),
                found: column.len(),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Number of rows (0 for a table without columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a column.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Column by position.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).and_then(|i| self.column_at(i))
    }

    /// Parse a JSON event dump:
    ///
    /// ```json
    /// { "columns": [ { "name": "MET", "dtype": "f64", "values": [41.5, null] },
    ///                { "name": "PT_lep", "dtype": "seq<f64>", "values": [[30.1], []] } ] }
    /// ```
    ///
    /// `null` (or the strings `"nan"`, `"inf"`, `"-inf"`) stand for
    /// non-finite floats, which JSON cannot spell.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawTable = serde_json::from_str(s)?;
        Self::from_raw(raw)
    }

    /// [`EventTable::from_json_str`] over a reader.
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let raw: RawTable = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    /// [`EventTable::from_json_str`] over a file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    fn from_raw(raw: RawTable) -> Result<Self> {
        let mut table = EventTable::new();
        for col in raw.columns {
            let column = match col.dtype {
                DType::Scalar(ty) => {
                    let scalars = col
                        .values
                        .iter()
                        .map(|v| json_scalar(v, ty, &col.name))
                        .collect::<Result<Vec<_>>>()?;
                    Column::Scalar(Seq::from_scalars(ty, scalars))
                }
                DType::Seq(ty) => {
                    let mut rows = Vec::with_capacity(col.values.len());
                    for v in &col.values {
                        let items = v.as_array().ok_or_else(|| {
                            FrameError::InvalidInput(format!(
                                "column '{}': expected an array per row, got {v}",
                                col.name
                            ))
                        })?;
                        rows.push(
                            items
                                .iter()
                                .map(|x| json_scalar(x, ty, &col.name))
                                .collect::<Result<Vec<_>>>()?,
                        );
                    }
                    Column::Jagged(Jagged::from_rows(ty, rows))
                }
                DType::Pairs => {
                    return Err(FrameError::InvalidInput(format!(
                        "column '{}': pair lists are derived, not stored",
                        col.name
                    )));
                }
            };
            table.add_column(col.name, column)?;
        }
        Ok(table)
    }
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<RawColumn>,
}

#[derive(Deserialize)]
struct RawColumn {
    name: String,
    dtype: DType,
    values: Vec<serde_json::Value>,
}

fn json_float(v: &serde_json::Value) -> Option<f64> {
    if v.is_null() {
        return Some(f64::NAN);
    }
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn json_scalar(v: &serde_json::Value, ty: ScalarType, column: &str) -> Result<Scalar> {
    let s = match ty {
        ScalarType::Bool => v.as_bool().or_else(|| v.as_i64().map(|n| n != 0)).map(Scalar::Bool),
        ScalarType::I32 => v.as_i64().and_then(|n| i32::try_from(n).ok()).map(Scalar::I32),
        ScalarType::U32 => v.as_u64().and_then(|n| u32::try_from(n).ok()).map(Scalar::U32),
        ScalarType::I64 => v.as_i64().map(Scalar::I64),
        ScalarType::U64 => v.as_u64().map(Scalar::U64),
        ScalarType::F32 => json_float(v).map(|x| Scalar::F32(x as f32)),
        ScalarType::F64 => json_float(v).map(Scalar::F64),
    };
    s.ok_or_else(|| FrameError::InvalidInput(format!("column '{column}': {v} is not a valid {ty}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jagged_rows() {
        let col = Column::jagged(vec![vec![1i32, 2], vec![], vec![3]]);
        assert_eq!(col.dtype(), DType::SEQ_I32);
        assert_eq!(col.len(), 3);
        assert_eq!(col.value_at(1), Some(Value::Seq(Seq::I32(vec![]))));
        assert_eq!(col.value_at(2), Some(Value::Seq(Seq::I32(vec![3]))));
        assert_eq!(col.value_at(3), None);
    }

    #[test]
    fn rejects_ragged_tables() {
        let err = EventTable::new()
            .with_column("a", Column::from(vec![1.0, 2.0]))
            .unwrap()
            .with_column("b", Column::from(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 2, found: 1, .. }));

        let err = EventTable::new()
            .with_column("a", Column::from(vec![1.0]))
            .unwrap()
            .with_column("a", Column::from(vec![2.0]))
            .unwrap_err();
        assert!(matches!(err, FrameError::DuplicateColumn(_)));
    }

    #[test]
    fn json_dump() {
        let table = EventTable::from_json_str(
            r#"{"columns": [
                {"name": "MET", "dtype": "f64", "values": [10.5, null]},
                {"name": "Charge_lep", "dtype": "seq<i32>", "values": [[1, -1], []]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.names(), ["MET", "Charge_lep"]);
        match table.column("MET").and_then(|c| c.value_at(1)) {
            Some(Value::Scalar(Scalar::F64(x))) => assert!(x.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(table.column("Charge_lep").unwrap().dtype(), DType::SEQ_I32);
    }

    #[test]
    fn json_rejects_out_of_range_ints() {
        let err = EventTable::from_json_str(
            r#"{"columns": [{"name": "n", "dtype": "u32", "values": [-1]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a valid u32"));
    }
}
