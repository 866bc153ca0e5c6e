pub mod anchor;
pub mod backend;
pub mod cancel;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod plan;
pub mod value;
pub mod visited;

// Re-export key types for convenience
pub use anchor::{AnchorMode, AnchorSpec};
pub use cancel::CancelToken;
pub use engine::Sampler;
pub use error::{DbSliceError, Result};
pub use value::{RowRecord, SqlValue};
