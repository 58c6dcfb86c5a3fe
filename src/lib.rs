//! filevault - per-owner file and folder storage
//!
//! A small document vault: owners keep a tree of folders and files whose
//! metadata lives in SQLite and whose bytes live on the local filesystem,
//! served over a JSON/HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::{Database, DbPool};
pub use error::{ErrorKind, Result, VaultError};
pub use file::{
    BlobStore, FileContent, FileService, FileStorage, MetadataStore, NewNode, Node, NodeKind,
    NodeRepository, NodeUpdate, UploadRequest,
};
