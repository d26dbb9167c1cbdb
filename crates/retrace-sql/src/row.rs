//! Row - dynamically-typed row decoding
//!
//! Captured rows must survive a JSON round trip, so each column is decoded to
//! a `serde_json::Value` by its Postgres type name. Binary columns are
//! base64-encoded; types with no JSON representation decode to null with a
//! warning rather than failing the capture.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use tracing::warn;
use uuid::Uuid;

use retrace_core::codec;

/// Decode a row into a column-name → JSON-value map
#[must_use]
pub fn row_to_json(row: &PgRow) -> Value {
    let mut map = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, index, column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    Value::Object(map)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(Value::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(|n| Value::Number(n.into()))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(|n| Value::Number(n.into()))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map(|n| Value::Number(n.into()))),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|n| float_value(f64::from(n)))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map(float_value)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map(Value::String)),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .map(|v| v.map(|bytes| Value::String(codec::encode(&bytes)))),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)
            .map(|v| v.map(|id| Value::String(id.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map(|v| v.map(|ts| Value::String(ts.to_rfc3339()))),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .map(|v| v.map(|ts| Value::String(ts.to_string()))),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .map(|v| v.map(|d| Value::String(d.to_string()))),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index),
        other => {
            warn!(column_type = other, "column type has no recorded form; storing null");
            return Value::Null;
        }
    };

    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(err) => {
            warn!(%err, "failed to decode column; storing null");
            Value::Null
        }
    }
}

fn float_value(n: f64) -> Value {
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}
