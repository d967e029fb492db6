//! An embedded, append-mostly, key-ordered storage engine.
//!
//! Records are written to named tables in monotonically increasing key
//! order, bucketed into fixed-capacity on-disk segments. See
//! [`Registry`] for the entry point: create a table, append records,
//! scan ranges, commit.

pub mod codec;
pub mod errors;
pub mod key;
pub mod registry;
pub mod search;
pub mod segment;
pub mod segment_set;

pub use errors::{RegistryError, SegmentError, SegmentSetError};
pub use key::Key;
pub use registry::{EngineConfig, Registry};

pub type RegistryResult<T> = Result<T, RegistryError>;
pub type SegmentSetResult<T> = Result<T, SegmentSetError>;
pub type SegmentResult<T> = Result<T, SegmentError>;
