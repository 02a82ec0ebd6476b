use clap::Parser;
use dotenvy::dotenv;
use image_upload_service::config::AppConfig;
use image_upload_service::infrastructure::{database, remote_storage};
use image_upload_service::services::image_repository::ImageRepository;
use image_upload_service::services::staging::LocalStager;
use image_upload_service::services::upload_service::ImageUploadService;
use image_upload_service::{AppState, create_app};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the API server to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_upload_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Image Upload Service...");

    // 2. Configuration, resolved once and passed down
    let config = AppConfig::from_env();
    info!(
        "🛡️  Config: Max Size={}MB, Staging Dir={}, Timeout={:?}",
        config.max_file_size / 1024 / 1024,
        config.staging_dir.display(),
        config.upload_timeout
    );

    // 3. Infrastructure
    let db = database::setup_database(&config.database_url).await?;
    let remote = remote_storage::setup_remote_storage(&config)?;

    let uploads = Arc::new(ImageUploadService::new(
        LocalStager::new(config.staging_dir.clone()),
        remote,
        ImageRepository::new(db.clone()),
        config.upload_timeout,
    ));

    let state = AppState {
        db,
        uploads,
        config,
    };

    // 4. HTTP
    let app = create_app(state);

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
