//! Typed row values and the fixed-width row codec
//!
//! A row is the concatenation of its column values in schema order; every
//! column has a fixed width so a column's byte range is the same in every row.

mod error;
mod schema;
mod value;

pub use error::{RecordError, RecordResult};
pub use schema::{Column, Schema};
pub use value::{DataType, Value};

/// Upper bound on the encoded width of one row
pub const MAX_RECORD_SIZE: usize = 1024;
