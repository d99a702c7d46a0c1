//! Services module
//!
//! Side-effectful collaborators that are not backends: upload storage.

pub mod uploads;

pub use uploads::{StoredDocument, UploadStore};
