use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use github_roaster::client::RoastClient;
use github_roaster::config::{AppConfig, ServeArgs};
use github_roaster::roast::Language;

/// GitHub profile roaster
#[derive(Parser, Debug)]
#[command(name = "github-roaster", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Roast a user through a running server
    Roast {
        username: String,

        /// `english` or `hindi`
        #[arg(short, long, default_value = "english")]
        language: Language,

        /// Base URL of the roaster server
        #[arg(long, default_value = "http://127.0.0.1:3000", env = "ROASTER_URL")]
        server: String,
    },
}

/// Logs go to stderr so `roast` output on stdout stays clean.
fn init_tracing(json: bool, default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
    token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            init_tracing(args.log_json, "github_roaster=debug,tower_http=info");
            info!("github-roaster starting");

            let config = AppConfig::from(args);
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));
            github_roaster::run(config, shutdown).await
        }
        Command::Roast {
            username,
            language,
            server,
        } => {
            init_tracing(false, "github_roaster=warn");
            let client = RoastClient::new(&server)?;
            match client.roast(&username, language).await {
                Ok(roast) => {
                    println!("{roast}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
