use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use todo_back::AppState;
use tokio::{signal, time};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Serve the todos resource over HTTP")]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 7890)]
    port: u16,

    #[arg(long, env = "DATA_FILE", default_value = "data.ron")]
    data_file: PathBuf,

    /// PEM certificate; TLS is enabled when both cert and key are given.
    #[arg(long, env = "SSL_CERT", requires = "key")]
    cert: Option<PathBuf>,

    #[arg(long, env = "SSL_KEY", requires = "cert")]
    key: Option<PathBuf>,

    /// Seconds between writes of the data file.
    #[arg(long, default_value_t = 300)]
    store_interval: u64,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let args = Args::parse();
    let state = Arc::new(AppState::load(&args.data_file)?);

    tokio::spawn({
        let state = state.clone();
        let path = args.data_file.clone();
        let interval = time::Duration::from_secs(args.store_interval.max(1));
        async move {
            loop {
                time::sleep(interval).await;
                if let Err(err) = state.store(&path).await {
                    tracing::error!("Failed to store data: {:?}", err);
                }
            }
        }
    });

    let app = todo_back::app(state.clone())?;
    let addr = SocketAddr::from(([0; 4], args.port));
    tracing::info!(%addr, tls = args.cert.is_some(), "listening");

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {:?}", err);
                return;
            }
            tracing::info!("shutting down");
            handle.graceful_shutdown(Some(time::Duration::from_secs(10)));
        }
    });

    match (args.cert, args.key) {
        (Some(cert), Some(key)) => {
            let config = RustlsConfig::from_pem_file(cert, key).await?;
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    state.store(&args.data_file).await?;
    tracing::info!(path = %args.data_file.display(), "data stored");

    Ok(())
}
