pub mod gemini;
pub mod retry;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use retry::{Backoff, RetryPolicy};
pub use traits::{CompletionProvider, ProviderError, TaskType};
