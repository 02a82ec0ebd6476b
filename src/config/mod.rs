use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use validator::Validate;

/// Cloudinary account credentials.
///
/// Resolved once at startup and handed by value to the remote storage
/// adapter. Empty fields are allowed here; the adapter rejects them when an
/// upload is attempted.
#[derive(Clone, Default, PartialEq, Eq, Validate)]
pub struct CloudinaryKeys {
    #[validate(length(min = 1, message = "cloud name is missing"))]
    pub cloud_name: String,

    #[validate(length(min = 1, message = "API key is missing"))]
    pub api_key: String,

    #[validate(length(min = 1, message = "API secret is missing"))]
    pub api_secret: String,
}

impl fmt::Debug for CloudinaryKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryKeys")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl CloudinaryKeys {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Parse a `cloudinary://<api_key>:<api_secret>@<cloud_name>` URL.
    pub fn from_cloudinary_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw.trim()).ok()?;
        if url.scheme() != "cloudinary" {
            return None;
        }

        Some(Self {
            cloud_name: url.host_str().unwrap_or_default().to_string(),
            api_key: url.username().to_string(),
            api_secret: url.password().unwrap_or_default().to_string(),
        })
    }

    /// Individual variables win; `CLOUDINARY_URL` fills whatever is left empty.
    fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let fallback = non_empty("CLOUDINARY_URL")
            .and_then(|raw| Self::from_cloudinary_url(&raw))
            .unwrap_or_default();

        Self {
            cloud_name: non_empty("CLOUDINARY_CLOUD_NAME").unwrap_or(fallback.cloud_name),
            api_key: non_empty("CLOUDINARY_API_KEY").unwrap_or(fallback.api_key),
            api_secret: non_empty("CLOUDINARY_API_SECRET").unwrap_or(fallback.api_secret),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Process-wide settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// sea-orm connection URL (default: local SQLite file)
    pub database_url: String,

    /// Maximum request body size for uploads in bytes (default: 20 MB)
    pub max_file_size: usize,

    /// Directory that holds staged uploads (default: OS temp dir)
    pub staging_dir: PathBuf,

    /// Upper bound for one stage/upload/persist sequence (default: 60s)
    pub upload_timeout: Duration,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    pub cloudinary: CloudinaryKeys,

    /// Base URL of the Cloudinary upload API
    pub cloudinary_api_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://images.db?mode=rwc".to_string(),
            max_file_size: 20 * 1024 * 1024, // 20 MB
            staging_dir: env::temp_dir(),
            upload_timeout: Duration::from_secs(60),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            cloudinary: CloudinaryKeys::default(),
            cloudinary_api_base: "https://api.cloudinary.com".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            database_url: get("DATABASE_URL").unwrap_or(default.database_url),

            max_file_size: get("MAX_FILE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            staging_dir: get("STAGING_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            upload_timeout: get("UPLOAD_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.upload_timeout),

            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),

            cloudinary: CloudinaryKeys::from_lookup(&get),

            cloudinary_api_base: get("CLOUDINARY_API_BASE")
                .filter(|v| !v.is_empty())
                .unwrap_or(default.cloudinary_api_base),
        }
    }
}
