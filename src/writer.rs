//! writer.rs
//!
//! The table writer: the only code that writes to the database. Two modes:
//! replace (drop, recreate, fill) and append (insert into an existing table).

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use crate::dataset::{Chunk, Dataset, Field, Row};
use crate::db_utils::{create_table_sql, drop_table_sql, insert_query, rows_per_insert};
use crate::errors::IngestError;

/// Database-facing operations the pipelines rely on.
#[async_trait]
pub trait TableWriter: Send {
    /// Drop and recreate `table` with the dataset's columns, then write all rows.
    async fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<(), IngestError>;

    /// Drop and recreate `table` with the dataset's columns and no rows.
    async fn create_empty_schema(&mut self, table: &str, dataset: &Dataset) -> Result<(), IngestError>;

    /// Insert the chunk's rows into an existing table. Rows are appended
    /// unconditionally; appending the same chunk twice duplicates it.
    async fn append_chunk(&mut self, table: &str, chunk: Chunk<'_>) -> Result<(), IngestError>;
}

/// Postgres writer over the run's single connection.
///
/// Each operation runs in its own transaction, so a failed call leaves the
/// table as the previous call left it.
pub struct PgTableWriter<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgTableWriter<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        PgTableWriter { conn }
    }
}

#[async_trait]
impl TableWriter for PgTableWriter<'_> {
    async fn replace_table(&mut self, table: &str, dataset: &Dataset) -> Result<(), IngestError> {
        let mut tx = self.conn.begin().await?;
        recreate(&mut tx, table, dataset.fields()).await?;
        insert_rows(&mut tx, table, dataset.fields(), dataset.rows()).await?;
        tx.commit().await?;
        debug!(table, rows = dataset.num_rows(), "Replaced table");
        Ok(())
    }

    async fn create_empty_schema(&mut self, table: &str, dataset: &Dataset) -> Result<(), IngestError> {
        let mut tx = self.conn.begin().await?;
        recreate(&mut tx, table, dataset.fields()).await?;
        tx.commit().await?;
        debug!(table, columns = dataset.num_columns(), "Created empty table");
        Ok(())
    }

    async fn append_chunk(&mut self, table: &str, chunk: Chunk<'_>) -> Result<(), IngestError> {
        let mut tx = self.conn.begin().await?;
        insert_rows(&mut tx, table, chunk.fields, chunk.rows).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn recreate(conn: &mut PgConnection, table: &str, fields: &[Field]) -> Result<(), IngestError> {
    sqlx::query(&drop_table_sql(table)).execute(&mut *conn).await?;
    sqlx::query(&create_table_sql(table, fields)).execute(&mut *conn).await?;
    Ok(())
}

async fn insert_rows(conn: &mut PgConnection, table: &str, fields: &[Field], rows: &[Row]) -> Result<(), IngestError> {
    if fields.is_empty() {
        return Ok(());
    }
    for batch in rows.chunks(rows_per_insert(fields.len())) {
        let mut query = insert_query(table, fields, batch);
        query.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// Create `table` empty, then append the dataset one chunk at a time in row
/// order. Stops at the first failed chunk; chunks already appended stay.
///
/// Returns the number of rows inserted.
pub async fn load_in_chunks<W: TableWriter + ?Sized>(
    writer: &mut W,
    table: &str,
    dataset: &Dataset,
    chunk_size: NonZeroUsize,
) -> Result<usize, IngestError> {
    info!(table, "Creating table");
    writer.create_empty_schema(table, dataset).await?;

    info!(table, rows = dataset.num_rows(), %chunk_size, "Inserting rows");
    let mut inserted = 0;
    for chunk in dataset.chunks(chunk_size) {
        let started = Instant::now();
        writer.append_chunk(table, chunk).await?;
        inserted += chunk.len();
        info!(
            table,
            rows = chunk.len(),
            total = inserted,
            elapsed = %elapsed_since(started),
            "Inserted chunk"
        );
    }
    Ok(inserted)
}

/// Millisecond-rounded elapsed time for progress logs.
pub(crate) fn elapsed_since(started: Instant) -> humantime::FormattedDuration {
    let millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    humantime::format_duration(Duration::from_millis(millis))
}
