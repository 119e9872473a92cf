pub mod oracle;
pub mod rag;

pub use oracle::{EntityHints, Oracle, Reformulation};
pub use rag::{QueryError, QueryPipeline, QueryResult};
