pub mod bootstrap;
pub mod store;

pub use bootstrap::bootstrap_store;
pub use store::{cosine_similarity, DocumentStore, IngestOptions, StoreError};
