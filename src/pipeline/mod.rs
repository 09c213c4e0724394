pub mod dispatcher;
pub mod error;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use dispatcher::{AuthVariant, Dispatcher};
pub use error::DispatchError;
