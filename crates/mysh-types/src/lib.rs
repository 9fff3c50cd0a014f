//! Pure data types for mysh — job ids, process status machine, job snapshots.
//!
//! This crate is a leaf dependency with no OS calls and no I/O, so the
//! status machine and the listing types can be tested and reused without
//! pulling in the process-control stack of mysh-kernel.

pub mod job;
pub mod result;

// Flat re-exports for convenience
pub use job::*;
pub use result::*;
