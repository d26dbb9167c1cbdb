//! Retrace HTTP - Inbound Request Adapter
//!
//! This crate wires the Retrace capture lifecycle into axum/tower services:
//! - Layer: `RecordLayer`/`RecordService` middleware
//! - Tee: response body fan-out into the capture buffer
//! - Params: path parameter recovery from matched route templates

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod layer;
pub mod params;
pub mod tee;

pub use layer::{RecordLayer, RecordService};
pub use params::extract_path_params;
pub use tee::TeeBody;
