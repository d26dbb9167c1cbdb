//! Retrace SQL - Outbound SQL Adapter
//!
//! This crate wraps a sqlx Postgres pool with the Retrace interception
//! protocol: query outcomes are recorded during capture and answered from
//! recorded data during replay, without acquiring a real connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod pool;
pub mod row;

pub use error::{Error, Result};
pub use pool::{RecordingPool, SqlParam};
pub use row::row_to_json;
