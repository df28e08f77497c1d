// Core error handling and cancellation shared by every module
pub mod cancel;
pub mod error;

// Re-exports for convenience
pub use cancel::CancellationToken;
pub use error::{Error, ErrorKind, Result};
