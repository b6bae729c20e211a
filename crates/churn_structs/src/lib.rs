//! Common structs for the churn dataset and its artifacts, shared across crates.

mod artifacts;
mod model_kind;
mod request;
mod schema;
mod table;

pub use artifacts::*;
pub use model_kind::*;
pub use request::*;
pub use schema::*;
pub use table::*;
