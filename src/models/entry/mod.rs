pub mod lookup;
mod queries;
mod types;
pub mod values;

pub use queries::*;
pub use types::*;
