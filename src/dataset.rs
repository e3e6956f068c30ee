//! dataset.rs
//!
//! In-memory tabular model shared by the readers, the remote fetcher and the
//! table writer: an ordered list of typed fields plus position-aligned rows.

use std::io::Read;
use std::num::NonZeroUsize;

use chrono::NaiveDateTime;

/// Cells a dataframe-style CSV reader treats as missing.
const NULL_MARKERS: &[&str] = &["", "NA", "N/A", "n/a", "#N/A", "NaN", "nan", "NULL", "null", "<NA>", "None"];

/// Column type tag; decides the Postgres column type and how nulls are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Text,
    Timestamp,
}

impl ColumnType {
    /// Postgres type used when the column is created.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMP WITHOUT TIME ZONE",
        }
    }
}

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Field { name: name.into(), ty }
    }
}

pub type Row = Vec<Value>;

/// Ordered named columns with rows aligned by position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    fields: Vec<Field>,
    rows: Vec<Row>,
}

/// A contiguous slice of a dataset's rows, borrowed together with its schema.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub fields: &'a [Field],
    pub rows: &'a [Row],
}

impl Chunk<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Dataset {
    /// Every row must have exactly one value per field.
    pub fn new(fields: Vec<Field>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == fields.len()));
        Dataset { fields, rows }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.fields.len()
    }

    /// Rewrite every cell of column `idx` through `convert` and retag it as `ty`.
    /// Stops at the first conversion error, leaving earlier cells converted.
    pub fn convert_column<E>(
        &mut self,
        idx: usize,
        ty: ColumnType,
        mut convert: impl FnMut(&Value) -> Result<Value, E>,
    ) -> Result<(), E> {
        for row in &mut self.rows {
            row[idx] = convert(&row[idx])?;
        }
        self.fields[idx].ty = ty;
        Ok(())
    }

    /// Consecutive chunks of at most `size` rows, in source row order.
    pub fn chunks(&self, size: NonZeroUsize) -> impl Iterator<Item = Chunk<'_>> {
        self.rows
            .chunks(size.get())
            .map(move |rows| Chunk { fields: &self.fields, rows })
    }

    /// Build a dataset from a headed CSV stream, inferring one type per column.
    pub fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, csv::Error> {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        let fields: Vec<Field> = headers
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let ty = infer_column_type(records.iter().map(|r| r.get(i).unwrap_or("")));
                Field { name, ty }
            })
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| parse_cell(record.get(i).unwrap_or(""), field.ty))
                    .collect()
            })
            .collect();

        Ok(Dataset { fields, rows })
    }
}

fn is_null(cell: &str) -> bool {
    NULL_MARKERS.contains(&cell)
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Narrowest type every non-null cell parses as. All-null columns become text.
fn infer_column_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let (mut seen, mut ints, mut floats, mut bools) = (false, true, true, true);
    for cell in cells.filter(|c| !is_null(c)) {
        seen = true;
        ints &= cell.parse::<i64>().is_ok();
        floats &= cell.parse::<f64>().is_ok();
        bools &= parse_bool(cell).is_some();
        if !(ints || floats || bools) {
            return ColumnType::Text;
        }
    }

    match (seen, ints, floats, bools) {
        (false, ..) => ColumnType::Text,
        (_, true, ..) => ColumnType::BigInt,
        (_, _, true, _) => ColumnType::Double,
        (_, _, _, true) => ColumnType::Boolean,
        _ => ColumnType::Text,
    }
}

fn parse_cell(cell: &str, ty: ColumnType) -> Value {
    if is_null(cell) {
        return Value::Null;
    }
    let parsed = match ty {
        ColumnType::BigInt => cell.parse().ok().map(Value::Int),
        ColumnType::Double => cell.parse().ok().map(Value::Float),
        ColumnType::Boolean => parse_bool(cell).map(Value::Bool),
        ColumnType::Text | ColumnType::Timestamp => None,
    };
    parsed.unwrap_or_else(|| Value::Text(cell.to_owned()))
}
