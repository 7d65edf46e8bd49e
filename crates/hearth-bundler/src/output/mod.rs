//! Output writing for engine results.

pub mod writer;

pub use writer::write_bundle_to;
