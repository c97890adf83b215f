pub mod error;
pub mod types;

pub use error::{DriverError, Result};
pub use types::{Column, ROWCOUNT_UNKNOWN, Row};
