//! Output generation for collected news digests.
//!
//! The pipeline's result is handed downstream as a JSON file; the
//! [`json`] submodule owns the serialization and file layout.

pub mod json;
