use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::entities::images;
use crate::services::UploadError;
use crate::services::image_repository::ImageRepository;
use crate::services::remote_storage::{RemoteImageStore, RemoteUpload};
use crate::services::staging::{LocalStager, StagedFile};

pub struct UploadOutcome {
    /// Where the file was staged. The file itself is gone by now.
    pub path: PathBuf,
    pub image: images::Model,
}

/// Runs stage → remote upload → persist → cleanup for one request.
pub struct ImageUploadService {
    stager: LocalStager,
    remote: Arc<dyn RemoteImageStore>,
    images: ImageRepository,
    timeout: Duration,
}

impl ImageUploadService {
    pub fn new(
        stager: LocalStager,
        remote: Arc<dyn RemoteImageStore>,
        images: ImageRepository,
        timeout: Duration,
    ) -> Self {
        Self {
            stager,
            remote,
            images,
            timeout,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteImageStore> {
        &self.remote
    }

    pub fn images(&self) -> &ImageRepository {
        &self.images
    }

    /// The timeout bounds staging and the remote upload. Once the remote host
    /// has accepted the file the row is always written (or the failure logged),
    /// so a deadline can never leave a committed row behind a 500.
    pub async fn handle_upload<R>(
        &self,
        file_name: Option<&str>,
        reader: R,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        // On timeout the in-flight future is dropped, and the StagedFile with it.
        let (staged, remote) =
            match tokio::time::timeout(self.timeout, self.stage_and_upload(file_name, reader))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        "Upload exceeded {:?} before the remote host answered; aborted (provider={} may still hold a copy)",
                        self.timeout,
                        self.remote.provider()
                    );
                    return Err(UploadError::Timeout(self.timeout));
                }
            };

        let path = staged.path().to_path_buf();
        let size = staged.size();
        let client_name = staged.file_name().unwrap_or("<unnamed>").to_string();

        let persisted = self.persist(&remote).await;

        cleanup(staged);

        let image = persisted?;
        info!(
            "✅ Stored image {} ({}, public_id={}, {} bytes) from {} [{}]",
            image.id,
            image.url,
            remote.public_id,
            size,
            client_name,
            path.display()
        );

        Ok(UploadOutcome { path, image })
    }

    async fn stage_and_upload<R>(
        &self,
        file_name: Option<&str>,
        reader: R,
    ) -> Result<(StagedFile, RemoteUpload), UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let staged = self.stager.stage(file_name, reader).await?;

        match self.remote.upload(staged.path()).await {
            Ok(remote) => Ok((staged, remote)),
            Err(e) => {
                cleanup(staged);
                Err(e.into())
            }
        }
    }

    async fn persist(&self, remote: &RemoteUpload) -> Result<images::Model, UploadError> {
        self.images.create(&remote.secure_url).await.map_err(|e| {
            // Nothing deletes the remote copy; leave a trace for manual cleanup.
            warn!(
                "Remote asset orphaned: provider={}, public_id={}, url={}",
                self.remote.provider(),
                remote.public_id,
                remote.secure_url
            );
            UploadError::Persistence(e)
        })
    }
}

fn cleanup(staged: StagedFile) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.cleanup() {
        warn!("Failed to remove staged file {}: {}", path.display(), e);
    }
}
