pub mod image_repository;
pub mod remote_storage;
pub mod staging;
pub mod upload_service;

use std::time::Duration;

use thiserror::Error;

use crate::services::remote_storage::RemoteStorageError;

/// Failure of one upload sequence, by the step that failed.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Staging I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("Remote storage error: {0}")]
    Remote(#[from] RemoteStorageError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),
}
