pub mod types;
pub mod errors;
pub mod middleware;
pub mod clients;
pub mod schema;
pub mod domain;

pub use types::*;
pub use errors::{AppError, ErrorCode, AppResult};
