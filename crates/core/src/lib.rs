pub mod errors;
pub mod models;

pub use errors::AppError;
pub use models::*;
