//! reader.rs
//!
//! Local source reader: the green-taxi Parquet trip file and the zone lookup
//! CSV, both living under the configured data directory.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::basic::{ConvertedType, LogicalType, Type as PhysicalType};
use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field as ParquetField;
use parquet::schema::types::Type as SchemaType;
use tracing::debug;

use crate::dataset::{ColumnType, Dataset, Field, Value};
use crate::errors::IngestError;

/// Pickup time column of the green taxi trip records.
pub const PICKUP_COLUMN: &str = "lpep_pickup_datetime";
/// Drop-off time column of the green taxi trip records.
pub const DROPOFF_COLUMN: &str = "lpep_dropoff_datetime";

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Read the trip Parquet file fully into memory and normalise the pickup and
/// drop-off columns to timestamps.
pub fn read_trip_dataset(path: &Path) -> Result<Dataset, IngestError> {
    let mut dataset = read_parquet(path)?;
    normalize_timestamps(&mut dataset, &[PICKUP_COLUMN, DROPOFF_COLUMN])?;
    Ok(dataset)
}

/// Read a headed CSV file as-is.
pub fn read_lookup_dataset(path: &Path) -> Result<Dataset, IngestError> {
    let file = File::open(path).map_err(|e| IngestError::Io(path.to_path_buf(), e))?;
    Dataset::from_csv(csv::Reader::from_reader(file))
        .map_err(|e| IngestError::Csv(path.display().to_string(), e))
}

/// Convert the named columns to [`ColumnType::Timestamp`].
///
/// Accepts native timestamps, text such as `2025-11-01 08:15:00` (with
/// optional fraction or `T` separator, or RFC 3339 with offset, taken as UTC),
/// and integers as nanoseconds since the Unix epoch. Nulls stay null.
pub fn normalize_timestamps(dataset: &mut Dataset, columns: &[&str]) -> Result<(), IngestError> {
    for &name in columns {
        let idx = dataset
            .column_index(name)
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))?;
        dataset.convert_column(idx, ColumnType::Timestamp, |value| to_timestamp(name, value))?;
    }
    Ok(())
}

fn to_timestamp(column: &str, value: &Value) -> Result<Value, IngestError> {
    let converted = match value {
        Value::Null => Some(Value::Null),
        Value::Timestamp(ts) => Some(Value::Timestamp(*ts)),
        Value::Int(nanos) => Some(Value::Timestamp(DateTime::from_timestamp_nanos(*nanos).naive_utc())),
        Value::Text(text) => parse_timestamp_text(text.trim()).map(Value::Timestamp),
        Value::Bool(_) | Value::Float(_) => None,
    };
    converted.ok_or_else(|| IngestError::InvalidTimestamp {
        column: column.to_string(),
        value: match value {
            Value::Text(text) => text.clone(),
            other => format!("{other:?}"),
        },
    })
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn read_parquet(path: &Path) -> Result<Dataset, IngestError> {
    let parquet_err = |e: ParquetError| IngestError::Parquet(path.to_path_buf(), e);

    let file = File::open(path).map_err(|e| IngestError::Io(path.to_path_buf(), e))?;
    let reader = SerializedFileReader::new(file).map_err(parquet_err)?;

    let metadata = reader.metadata().file_metadata();
    let fields: Vec<Field> = metadata
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|t| Field::new(t.name(), column_type(t)))
        .collect();
    debug!(path = %path.display(), rows = metadata.num_rows(), columns = fields.len(), "Parquet schema");

    let mut rows = Vec::with_capacity(usize::try_from(metadata.num_rows()).unwrap_or(0));
    for row in reader.get_row_iter(None).map_err(parquet_err)? {
        let row = row.map_err(parquet_err)?;
        rows.push(row.get_column_iter().map(|(_, f)| convert_field(f)).collect());
    }

    let mut dataset = Dataset::new(fields, rows);

    // Nanosecond timestamps come back from the row API as plain integers.
    let timestamp_columns: Vec<String> = dataset
        .fields()
        .iter()
        .filter(|f| f.ty == ColumnType::Timestamp)
        .map(|f| f.name.clone())
        .collect();
    let names: Vec<&str> = timestamp_columns.iter().map(String::as_str).collect();
    normalize_timestamps(&mut dataset, &names)?;

    Ok(dataset)
}

fn column_type(t: &SchemaType) -> ColumnType {
    if !t.is_primitive() {
        return ColumnType::Text;
    }
    let info = t.get_basic_info();
    let logical = info.logical_type();
    if matches!(logical, Some(LogicalType::Timestamp { .. }))
        || matches!(info.converted_type(), ConvertedType::TIMESTAMP_MILLIS | ConvertedType::TIMESTAMP_MICROS)
    {
        return ColumnType::Timestamp;
    }

    match t.get_physical_type() {
        PhysicalType::BOOLEAN => ColumnType::Boolean,
        PhysicalType::INT32 | PhysicalType::INT64 => match logical {
            Some(LogicalType::Date) | Some(LogicalType::Decimal { .. }) | Some(LogicalType::Time { .. }) => {
                ColumnType::Text
            }
            _ => ColumnType::BigInt,
        },
        PhysicalType::FLOAT | PhysicalType::DOUBLE => ColumnType::Double,
        PhysicalType::INT96 => ColumnType::Timestamp,
        _ => ColumnType::Text,
    }
}

fn convert_field(field: &ParquetField) -> Value {
    match field {
        ParquetField::Null => Value::Null,
        ParquetField::Bool(v) => Value::Bool(*v),
        ParquetField::Byte(v) => Value::Int(i64::from(*v)),
        ParquetField::Short(v) => Value::Int(i64::from(*v)),
        ParquetField::Int(v) => Value::Int(i64::from(*v)),
        ParquetField::Long(v) => Value::Int(*v),
        ParquetField::UByte(v) => Value::Int(i64::from(*v)),
        ParquetField::UShort(v) => Value::Int(i64::from(*v)),
        ParquetField::UInt(v) => Value::Int(i64::from(*v)),
        ParquetField::ULong(v) => i64::try_from(*v).map_or_else(|_| Value::Text(v.to_string()), Value::Int),
        ParquetField::Float(v) => Value::Float(f64::from(*v)),
        ParquetField::Double(v) => Value::Float(*v),
        ParquetField::Str(s) => Value::Text(s.clone()),
        ParquetField::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)
            .map_or_else(|| Value::Text(ms.to_string()), |dt| Value::Timestamp(dt.naive_utc())),
        ParquetField::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)
            .map_or_else(|| Value::Text(us.to_string()), |dt| Value::Timestamp(dt.naive_utc())),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
    use parquet::file::properties::WriterProperties;
    use parquet::file::writer::SerializedFileWriter;
    use parquet::schema::parser::parse_message_type;

    fn ts(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn micros(text: &str) -> i64 {
        ts(text).and_utc().timestamp_micros()
    }

    fn write_trip_fixture(path: &Path) {
        let schema = Arc::new(
            parse_message_type(
                "message schema {
                    REQUIRED INT64 VendorID;
                    OPTIONAL INT64 lpep_pickup_datetime (TIMESTAMP(MICROS,false));
                    REQUIRED INT64 lpep_dropoff_datetime (TIMESTAMP(MICROS,false));
                    REQUIRED BYTE_ARRAY store_and_fwd_flag (UTF8);
                }",
            )
            .unwrap(),
        );
        let props = Arc::new(WriterProperties::builder().build());
        let mut writer = SerializedFileWriter::new(File::create(path).unwrap(), schema, props).unwrap();

        let mut row_group = writer.next_row_group().unwrap();
        let mut idx = 0;
        while let Some(mut column) = row_group.next_column().unwrap() {
            match idx {
                0 => {
                    column.typed::<Int64Type>().write_batch(&[2, 1], None, None).unwrap();
                }
                1 => {
                    column
                        .typed::<Int64Type>()
                        .write_batch(&[micros("2025-11-01 08:15:00")], Some(&[1, 0]), None)
                        .unwrap();
                }
                2 => {
                    column
                        .typed::<Int64Type>()
                        .write_batch(&[micros("2025-11-01 08:40:30"), micros("2025-11-02 00:00:00")], None, None)
                        .unwrap();
                }
                _ => {
                    column
                        .typed::<ByteArrayType>()
                        .write_batch(&[ByteArray::from("N"), ByteArray::from("Y")], None, None)
                        .unwrap();
                }
            }
            column.close().unwrap();
            idx += 1;
        }
        row_group.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn trip_parquet_keeps_schema_and_exact_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("green_tripdata.parquet");
        write_trip_fixture(&path);

        let ds = read_trip_dataset(&path).unwrap();

        assert_eq!(
            ds.column_names(),
            vec!["VendorID", PICKUP_COLUMN, DROPOFF_COLUMN, "store_and_fwd_flag"]
        );
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(ds.fields()[0].ty, ColumnType::BigInt);
        assert_eq!(ds.fields()[1].ty, ColumnType::Timestamp);
        assert_eq!(ds.fields()[2].ty, ColumnType::Timestamp);
        assert_eq!(ds.fields()[3].ty, ColumnType::Text);

        assert_eq!(ds.rows()[0][1], Value::Timestamp(ts("2025-11-01 08:15:00")));
        assert_eq!(ds.rows()[0][2], Value::Timestamp(ts("2025-11-01 08:40:30")));
        assert_eq!(ds.rows()[1][1], Value::Null);
        assert_eq!(ds.rows()[1][3], Value::Text("Y".into()));
    }

    #[test]
    fn text_and_integer_timestamps_are_normalised() {
        let mut ds = Dataset::new(
            vec![
                Field::new(PICKUP_COLUMN, ColumnType::Text),
                Field::new(DROPOFF_COLUMN, ColumnType::BigInt),
            ],
            vec![
                vec![Value::Text("2025-11-01 08:15:00".into()), Value::Int(1_761_984_900_000_000_000)],
                vec![Value::Text("2025-11-01T08:15:00.250".into()), Value::Null],
            ],
        );

        normalize_timestamps(&mut ds, &[PICKUP_COLUMN, DROPOFF_COLUMN]).unwrap();

        assert!(ds.fields().iter().all(|f| f.ty == ColumnType::Timestamp));
        assert_eq!(ds.rows()[0][0], Value::Timestamp(ts("2025-11-01 08:15:00")));
        assert_eq!(ds.rows()[0][1], Value::Timestamp(ts("2025-11-01 08:15:00")));
        let with_millis = ts("2025-11-01 08:15:00") + chrono::Duration::milliseconds(250);
        assert_eq!(ds.rows()[1][0], Value::Timestamp(with_millis));
        assert_eq!(ds.rows()[1][1], Value::Null);
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        let mut ds = Dataset::new(
            vec![Field::new(PICKUP_COLUMN, ColumnType::Text)],
            vec![vec![Value::Text("yesterday".into())]],
        );
        let err = normalize_timestamps(&mut ds, &[PICKUP_COLUMN]).unwrap_err();
        assert!(matches!(err, IngestError::InvalidTimestamp { ref value, .. } if value == "yesterday"));
    }

    #[test]
    fn missing_timestamp_column_is_an_error() {
        let mut ds = Dataset::new(vec![Field::new("VendorID", ColumnType::BigInt)], vec![]);
        let err = normalize_timestamps(&mut ds, &[PICKUP_COLUMN]).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(ref c) if c == PICKUP_COLUMN));
    }

    #[test]
    fn missing_files_are_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_trip_dataset(&dir.path().join("nope.parquet")),
            Err(IngestError::Io(..))
        ));
        assert!(matches!(
            read_lookup_dataset(&dir.path().join("nope.csv")),
            Err(IngestError::Io(..))
        ));
    }

    #[test]
    fn non_parquet_file_is_a_parquet_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.parquet");
        File::create(&path).unwrap().write_all(b"LocationID,Borough\n1,EWR\n").unwrap();
        assert!(matches!(read_trip_dataset(&path), Err(IngestError::Parquet(..))));
    }

    #[test]
    fn lookup_csv_is_read_untransformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxi_zone_lookup.csv");
        std::fs::write(
            &path,
            "\"LocationID\",\"Borough\",\"Zone\",\"service_zone\"\n1,\"EWR\",\"Newark Airport\",\"EWR\"\n2,\"Queens\",\"Jamaica Bay\",\"Boro Zone\"\n",
        )
        .unwrap();

        let ds = read_lookup_dataset(&path).unwrap();
        assert_eq!(ds.column_names(), vec!["LocationID", "Borough", "Zone", "service_zone"]);
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(ds.rows()[1][2], Value::Text("Jamaica Bay".into()));
    }
}
