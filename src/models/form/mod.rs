mod queries;
pub mod schema;
mod types;

pub use queries::*;
pub use types::*;
