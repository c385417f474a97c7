//! lectern-viewer: join a presentation session as a viewer or presenter.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lectern_config::load_config;
use lectern_session::{ClientEvent, Role, ServerEvent};
use lectern_viewer::console::{self, ConsoleCommand};
use lectern_viewer::{
    ClientConfig, Follower, LogRenderer, RemoteDocuments, RenderScheduler, SessionClient,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "lectern-viewer", about = "Follow a live presentation")]
struct Args {
    /// Server URL, e.g. ws://127.0.0.1:3000/. Overrides the config file.
    #[arg(short, long)]
    url: Option<String>,

    /// Join as the presenter and drive the session from stdin.
    #[arg(long)]
    presenter: bool,

    /// Config file (defaults to the platform config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lectern-viewer: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = args.url {
        config.viewer.url = url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .filter_for(&["lectern_viewer"])
                    .into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let role = if args.presenter {
        Role::Presenter
    } else {
        Role::Viewer
    };

    let (client, mut events) =
        SessionClient::connect(ClientConfig::from_config(&config, role));
    let documents = RemoteDocuments::new(
        client.clone(),
        Duration::from_secs(config.viewer.fetch_timeout_secs),
    );
    let scheduler = RenderScheduler::new(Arc::new(documents.clone()), Arc::new(LogRenderer::new()));
    let mut follower = Follower::new(role, scheduler, documents);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if args.presenter {
        println!("{}", console::HELP);
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Some(reply) = follower.handle(event) {
                    report(&reply);
                }
            }

            line = lines.next_line(), if args.presenter => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                match console::parse(&line) {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = run_command(command, &client, &mut follower).await {
                            eprintln!("{e}");
                        }
                    }
                    Err(message) if message.is_empty() => {}
                    Err(message) => eprintln!("{message}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    client.disconnect().await;
    ExitCode::SUCCESS
}

/// Execute one presenter command.
async fn run_command(
    command: ConsoleCommand,
    client: &SessionClient,
    follower: &mut Follower,
) -> lectern_common::Result<()> {
    let event = match command {
        ConsoleCommand::Next => follower.next_page(),
        ConsoleCommand::Prev => follower.prev_page(),
        ConsoleCommand::Goto(page) => follower.goto(page),
        ConsoleCommand::Select(document) => follower.select(document),
        ConsoleCommand::List => Some(ClientEvent::ListDocuments),
        ConsoleCommand::Clear => Some(ClientEvent::ClearDocuments),
        ConsoleCommand::Upload(path) => Some(read_upload(&path).await?),
        ConsoleCommand::Help => {
            println!("{}", console::HELP);
            None
        }
        ConsoleCommand::Quit => None,
    };

    match event {
        Some(event) => client.send(event).await,
        None => Ok(()),
    }
}

async fn read_upload(path: &Path) -> lectern_common::Result<ClientEvent> {
    let bytes = tokio::fs::read(path).await.inspect_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Cannot read upload");
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());
    Ok(ClientEvent::upload(name, &bytes))
}

/// Print replies addressed to this participant.
fn report(event: &ServerEvent) {
    match event {
        ServerEvent::DocumentList { documents } if documents.is_empty() => {
            println!("no documents uploaded");
        }
        ServerEvent::DocumentList { documents } => {
            for document in documents {
                println!("  {document}");
            }
        }
        ServerEvent::Uploaded { document } => println!("uploaded {document}"),
        ServerEvent::Cleared { removed } => println!("removed {removed} document(s)"),
        ServerEvent::Error { message } => eprintln!("server: {message}"),
        other => tracing::debug!(event = ?other, "Unhandled server event"),
    }
}
