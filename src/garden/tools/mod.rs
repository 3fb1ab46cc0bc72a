pub mod catalogue;
pub mod config;
pub mod error;
pub mod fetch;
pub mod io;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod sync;
pub mod tag;

pub use error::{Result, ToolError};
