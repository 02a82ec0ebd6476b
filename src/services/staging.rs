use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// An uploaded file written to local disk for the lifetime of one request.
///
/// The file is removed when the value is dropped. Call [`StagedFile::cleanup`]
/// to remove it explicitly and observe failures.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    size: u64,
    file_name: Option<String>,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// File name as sent by the client, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn cleanup(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Writes incoming upload streams to uniquely named files.
#[derive(Debug, Clone)]
pub struct LocalStager {
    dir: PathBuf,
}

impl LocalStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stream `reader` into a new file in the staging directory.
    ///
    /// Content is not inspected. A partially written file is removed before
    /// the error is returned.
    pub async fn stage<R>(&self, file_name: Option<&str>, mut reader: R) -> io::Result<StagedFile>
    where
        R: AsyncRead + Unpin + Send,
    {
        tokio::fs::create_dir_all(&self.dir).await?;

        let suffix = file_name
            .and_then(staged_extension)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let named = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        let (file, path) = named.into_parts();

        let mut file = tokio::fs::File::from_std(file);
        let size = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        drop(file);

        tracing::debug!("Staged {} bytes at {}", size, path.display());

        Ok(StagedFile {
            path,
            size,
            file_name: file_name.map(str::to_string),
        })
    }
}

/// Extension of the client file name, kept only when it is short and alphanumeric.
fn staged_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
