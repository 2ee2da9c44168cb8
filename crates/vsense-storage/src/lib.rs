//! S3 blob store client for video assets.
//!
//! The pipeline treats storage as a key-addressed blob store; this crate
//! provides the `BlobStore` contract and its S3 implementation.

pub mod client;
pub mod error;

pub use client::{BlobStore, S3Client, S3Config};
pub use error::{StorageError, StorageResult};
