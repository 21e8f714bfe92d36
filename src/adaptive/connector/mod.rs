pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod personnel;
pub mod reshape;
pub mod sync;

pub use error::{ConnectorError, Result};
