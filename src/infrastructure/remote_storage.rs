use crate::config::AppConfig;
use crate::services::remote_storage::{CloudinaryStorage, RemoteImageStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn setup_remote_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteImageStore>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(config.upload_timeout)
        .build()?;

    let keys = config.cloudinary.clone();
    if keys.is_complete() {
        info!(
            "☁️  Remote Storage: Cloudinary (cloud: {}, api: {})",
            keys.cloud_name, config.cloudinary_api_base
        );
    } else {
        warn!("⚠️  Cloudinary credentials incomplete ({:?}); uploads will fail", keys);
    }

    Ok(Arc::new(CloudinaryStorage::new(
        client,
        keys,
        config.cloudinary_api_base.clone(),
    )))
}
