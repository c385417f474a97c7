//! lectern-server: presentation session server.
//!
//! One presenter drives page navigation and document selection; every
//! connected viewer follows along over a WebSocket.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lectern_common::LecternError;
use lectern_config::{config_to_json, load_config};
use lectern_server::settings::{apply_overrides, Overrides};
use lectern_server::{serve, ServerContext};
use lectern_session::{message_limit, FsDocumentStore, Hub};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "lectern-server", about = "Live presentation session server")]
struct Args {
    /// Config file (defaults to the platform config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on. Overrides the config file and $PORT.
    #[arg(short, long)]
    port: Option<u32>,

    /// Directory holding uploaded documents.
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lectern-server: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> lectern_common::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(
        &mut config,
        Overrides {
            port: args.port,
            env_port: std::env::var("PORT").ok(),
            upload_dir: args.upload_dir,
        },
    )?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .filter_for(&["lectern_server", "lectern_session"])
                    .into()
            }),
        )
        .init();

    if args.print_config {
        println!("{}", config_to_json(&config));
        return Ok(());
    }

    let store = FsDocumentStore::new(
        &config.storage.upload_dir,
        config.storage.max_upload_bytes(),
        &config.storage.allowed_extensions,
    )
    .inspect_err(|e| {
        tracing::error!(
            dir = %config.storage.upload_dir.display(),
            error = %e,
            "Failed to open upload directory"
        );
    })?;

    let hub = Hub::new(config.server.outbound_buffer as usize).spawn();

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Failed to bind TCP listener");
        LecternError::Io(e)
    })?;

    let ctx = ServerContext {
        hub,
        store: Arc::new(store),
        hello_timeout: Duration::from_secs(u64::from(config.server.hello_timeout_secs)),
        max_message_bytes: message_limit(config.storage.max_upload_bytes()),
    };
    serve(listener, ctx).await;
    Ok(())
}
