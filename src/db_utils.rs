use sqlx::postgres::{PgConnection, Postgres};
use sqlx::query_builder::Separated;
use sqlx::{Connection, QueryBuilder};
use tracing::info;

use crate::config::DatabaseSettings;
use crate::dataset::{ColumnType, Field, Row, Value};
use crate::errors::IngestError;

/// Postgres accepts at most this many bind parameters in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Opens the run's single connection and checks it answers a trivial query.
///
/// # Arguments
///
/// * `settings` - Database coordinates; the password is never logged.
///
/// # Returns
///
/// * `Ok(PgConnection)` - A live connection, owned by the caller for the whole run.
/// * `Err(IngestError::Connect)` - If connecting or the `SELECT 1` check fails.
pub async fn connect_and_check(settings: &DatabaseSettings) -> Result<PgConnection, IngestError> {
    let target = settings.display_target();
    info!(%target, "Connecting to database");

    let connect_err = |e| IngestError::Connect(target.clone(), e);
    let mut conn = PgConnection::connect(settings.connection_url()?.as_str())
        .await
        .map_err(connect_err)?;
    sqlx::query("SELECT 1").execute(&mut conn).await.map_err(connect_err)?;

    info!(%target, "Database connection successful");
    Ok(conn)
}

/// Double-quotes an identifier so column names like `VendorID` keep their case.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// `CREATE TABLE` with one column per field, in field order.
pub fn create_table_sql(table: &str, fields: &[Field]) -> String {
    let columns = fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), f.ty.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), columns)
}

/// How many rows fit in one multi-row INSERT for a table this wide.
pub fn rows_per_insert(num_columns: usize) -> usize {
    (MAX_BIND_PARAMS / num_columns.max(1)).max(1)
}

/// Builds `INSERT INTO "table" ("a", "b") VALUES ($1, $2), ...` for `rows`.
pub fn insert_query<'q>(table: &str, fields: &'q [Field], rows: &'q [Row]) -> QueryBuilder<'q, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {} (", quote_ident(table)));
    let mut columns = builder.separated(", ");
    for field in fields {
        columns.push(quote_ident(&field.name));
    }
    builder.push(") ");

    builder.push_values(rows, |mut b, row| {
        for (field, value) in fields.iter().zip(row) {
            push_value(&mut b, field.ty, value);
        }
    });
    builder
}

/// Nulls are bound with the column's own type so Postgres sees consistent parameters.
fn push_value<'q>(b: &mut Separated<'_, 'q, Postgres, &'static str>, ty: ColumnType, value: &'q Value) {
    match value {
        Value::Bool(v) => b.push_bind(*v),
        Value::Int(v) => b.push_bind(*v),
        Value::Float(v) => b.push_bind(*v),
        Value::Text(v) => b.push_bind(v.as_str()),
        Value::Timestamp(v) => b.push_bind(*v),
        Value::Null => match ty {
            ColumnType::Boolean => b.push_bind(None::<bool>),
            ColumnType::BigInt => b.push_bind(None::<i64>),
            ColumnType::Double => b.push_bind(None::<f64>),
            ColumnType::Text => b.push_bind(None::<String>),
            ColumnType::Timestamp => b.push_bind(None::<chrono::NaiveDateTime>),
        },
    };
}
