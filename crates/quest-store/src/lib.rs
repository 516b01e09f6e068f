pub mod dataset;
pub mod error;
pub mod schema;
pub mod source;
pub mod store;

pub use dataset::{Dataset, ImportSummary};
pub use error::{Result, StoreError};
pub use store::Store;
