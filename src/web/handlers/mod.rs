//! API handlers for filevault.

pub mod file;

pub use file::*;

use crate::file::FileService;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The file service all operations go through.
    pub files: FileService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}
