//! PostgreSQL backend
//!
//! One `PostgresConnection` per (server, database) pair, built on
//! tokio-postgres. The rest of the application talks to this through the
//! synchronous [`ConnectionPool`](crate::db::pool::ConnectionPool); the
//! async surface stays inside this module and the pool.

use rust_decimal::Decimal;
use tokio_postgres::Client;
use tokio_postgres::types::Type;

use crate::config::servers::{ServerConfig, SslMode};
use crate::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row};
use crate::error::{DbError, DbResult};

/// A live connection to one database
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    /// Connect to `database` on the configured server.
    ///
    /// The background connection task is spawned onto the ambient tokio
    /// runtime; a lost connection is logged and later detected through
    /// [`Self::is_closed`].
    pub async fn connect(config: &ServerConfig, database: &str) -> DbResult<Self> {
        let conn_string = config.connection_string_with_password(database);
        let client = match config.ssl_mode {
            SslMode::Disable => {
                let (client, connection) =
                    tokio_postgres::connect(&conn_string, tokio_postgres::NoTls)
                        .await
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::warn!("connection lost: {e}");
                    }
                });
                client
            }
            SslMode::Prefer | SslMode::Require => {
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
                let (client, connection) = tokio_postgres::connect(&conn_string, tls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::warn!("connection lost: {e}");
                    }
                });
                client
            }
        };
        Ok(Self { client })
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Execute one statement.
    ///
    /// Statements without a result shape (DDL, DML without RETURNING)
    /// report their affected-row count through `row_count` with no columns.
    pub async fn execute_query(&self, sql: &str) -> DbResult<QueryResults> {
        let start = std::time::Instant::now();

        let stmt = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;

        if stmt.columns().is_empty() {
            let affected = self
                .client
                .execute(&stmt, &[])
                .await
                .map_err(|e| DbError::QueryFailed(e.to_string()))?;
            return Ok(QueryResults::new(
                Vec::new(),
                Vec::new(),
                start.elapsed(),
                affected as usize,
            ));
        }

        let columns: Vec<ColumnDef> = stmt
            .columns()
            .iter()
            .map(|col| ColumnDef {
                name: col.name().to_string(),
                data_type: pg_type_to_datatype(col.type_()),
            })
            .collect();

        let pg_rows = self
            .client
            .query(&stmt, &[])
            .await
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;

        let row_count = pg_rows.len();
        let rows = pg_rows
            .iter()
            .map(|pg_row| Row {
                values: columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| extract_cell_value(pg_row, i, &col.data_type))
                    .collect(),
            })
            .collect();

        Ok(QueryResults::new(columns, rows, start.elapsed(), row_count))
    }
}

/// Map tokio_postgres Type to our DataType enum
fn pg_type_to_datatype(pg_type: &Type) -> DataType {
    match *pg_type {
        Type::INT2 => DataType::SmallInt,
        Type::INT4 => DataType::Integer,
        Type::INT8 => DataType::BigInt,
        Type::FLOAT4 => DataType::Real,
        Type::FLOAT8 => DataType::Double,
        Type::NUMERIC => DataType::Numeric,
        Type::TEXT | Type::NAME => DataType::Text,
        Type::VARCHAR => DataType::Varchar(None),
        Type::CHAR | Type::BPCHAR => DataType::Char(None),
        Type::BOOL => DataType::Boolean,
        Type::DATE => DataType::Date,
        Type::TIME => DataType::Time,
        Type::TIMESTAMP => DataType::Timestamp,
        Type::TIMESTAMPTZ => DataType::TimestampTz,
        Type::INTERVAL => DataType::Interval,
        Type::JSON => DataType::Json,
        Type::JSONB => DataType::Jsonb,
        Type::BYTEA => DataType::Bytea,
        Type::UUID => DataType::Uuid,
        Type::BOOL_ARRAY => DataType::Array(Box::new(DataType::Boolean)),
        Type::INT2_ARRAY => DataType::Array(Box::new(DataType::SmallInt)),
        Type::INT4_ARRAY => DataType::Array(Box::new(DataType::Integer)),
        Type::INT8_ARRAY => DataType::Array(Box::new(DataType::BigInt)),
        Type::FLOAT4_ARRAY => DataType::Array(Box::new(DataType::Real)),
        Type::FLOAT8_ARRAY => DataType::Array(Box::new(DataType::Double)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::NAME_ARRAY => {
            DataType::Array(Box::new(DataType::Text))
        }
        Type::UUID_ARRAY => DataType::Array(Box::new(DataType::Uuid)),
        Type::JSON_ARRAY => DataType::Array(Box::new(DataType::Json)),
        Type::JSONB_ARRAY => DataType::Array(Box::new(DataType::Jsonb)),
        Type::NUMERIC_ARRAY => DataType::Array(Box::new(DataType::Numeric)),
        _ => DataType::Unknown(pg_type.name().to_string()),
    }
}

/// Extract `row[idx]` as `$ty`, mapping through `$wrap`; NULL stays NULL and
/// a type mismatch falls back to the string representation.
macro_rules! typed_cell {
    ($row:expr, $idx:expr, $ty:ty, $wrap:expr) => {
        match $row.try_get::<_, Option<$ty>>($idx) {
            Ok(Some(v)) => $wrap(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string($row, $idx),
        }
    };
}

/// Same as `typed_cell!` but for `Vec<$ty>` array columns
macro_rules! typed_array {
    ($row:expr, $idx:expr, $ty:ty, $map:expr) => {
        match $row.try_get::<_, Option<Vec<$ty>>>($idx) {
            Ok(Some(v)) => CellValue::Array(v.into_iter().map($map).collect()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string($row, $idx),
        }
    };
}

/// Extract a cell from a tokio_postgres row based on the column's DataType.
///
/// Typed extraction is attempted first, falling back to a string
/// representation when the wire type doesn't match.
fn extract_cell_value(row: &tokio_postgres::Row, idx: usize, data_type: &DataType) -> CellValue {
    match data_type {
        DataType::SmallInt => typed_cell!(row, idx, i16, |v| CellValue::Integer(v as i64)),
        DataType::Integer => typed_cell!(row, idx, i32, |v| CellValue::Integer(v as i64)),
        DataType::BigInt => typed_cell!(row, idx, i64, CellValue::Integer),
        DataType::Real => typed_cell!(row, idx, f32, |v| CellValue::Float(v as f64)),
        DataType::Double => typed_cell!(row, idx, f64, CellValue::Float),
        DataType::Numeric => typed_cell!(row, idx, Decimal, |v: Decimal| CellValue::Text(
            v.to_string()
        )),
        DataType::Boolean => typed_cell!(row, idx, bool, CellValue::Boolean),
        DataType::Json | DataType::Jsonb => {
            typed_cell!(row, idx, serde_json::Value, CellValue::Json)
        }
        DataType::Bytea => typed_cell!(row, idx, Vec<u8>, CellValue::Binary),
        DataType::Uuid => typed_cell!(row, idx, uuid::Uuid, |v: uuid::Uuid| CellValue::Uuid(
            v.to_string()
        )),
        DataType::Array(inner) => extract_array_value(row, idx, inner),
        DataType::Timestamp
        | DataType::TimestampTz
        | DataType::Date
        | DataType::Time
        | DataType::Interval => extract_datetime(row, idx),
        _ => try_as_string(row, idx),
    }
}

fn extract_array_value(row: &tokio_postgres::Row, idx: usize, inner: &DataType) -> CellValue {
    match inner {
        DataType::Text | DataType::Varchar(_) | DataType::Char(_) => {
            typed_array!(row, idx, String, CellValue::Text)
        }
        DataType::SmallInt => typed_array!(row, idx, i16, |n| CellValue::Integer(n as i64)),
        DataType::Integer => typed_array!(row, idx, i32, |n| CellValue::Integer(n as i64)),
        DataType::BigInt => typed_array!(row, idx, i64, CellValue::Integer),
        DataType::Real => typed_array!(row, idx, f32, |n| CellValue::Float(n as f64)),
        DataType::Double => typed_array!(row, idx, f64, CellValue::Float),
        DataType::Boolean => typed_array!(row, idx, bool, CellValue::Boolean),
        DataType::Uuid => {
            typed_array!(row, idx, uuid::Uuid, |u: uuid::Uuid| CellValue::Uuid(
                u.to_string()
            ))
        }
        DataType::Json | DataType::Jsonb => {
            typed_array!(row, idx, serde_json::Value, CellValue::Json)
        }
        DataType::Numeric => {
            typed_array!(row, idx, Decimal, |d: Decimal| CellValue::Text(d.to_string()))
        }
        _ => try_as_string(row, idx),
    }
}

/// Date/time columns arrive in several shapes; try text first, then the
/// chrono types.
fn extract_datetime(row: &tokio_postgres::Row, idx: usize) -> CellValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => CellValue::DateTime(v),
        Ok(None) => CellValue::Null,
        Err(_) => {
            if let Ok(Some(v)) = row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
                return CellValue::DateTime(v.to_string());
            }
            if let Ok(Some(v)) = row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx) {
                return CellValue::DateTime(v.to_string());
            }
            if let Ok(Some(v)) = row.try_get::<_, Option<chrono::NaiveDate>>(idx) {
                return CellValue::DateTime(v.to_string());
            }
            if let Ok(Some(v)) = row.try_get::<_, Option<chrono::NaiveTime>>(idx) {
                return CellValue::DateTime(v.to_string());
            }
            try_as_string(row, idx)
        }
    }
}

/// String fallback for type mismatches; names the postgres type when even
/// that fails.
fn try_as_string(row: &tokio_postgres::Row, idx: usize) -> CellValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => CellValue::Text(v),
        Ok(None) => CellValue::Null,
        Err(_) => {
            let type_name = row
                .columns()
                .get(idx)
                .map_or("unknown", |c| c.type_().name());
            CellValue::Text(format!("<unable to display: {}>", type_name))
        }
    }
}

/// Build a rustls ClientConfig trusting OS certificates, with Mozilla roots
/// as fallback
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}
