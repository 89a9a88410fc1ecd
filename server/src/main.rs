//! Standalone runner for the in-memory protocol test double — useful for
//! mounting a real `netfuse` client against something without standing up
//! the production remote server (spec.md §1 treats that server as an
//! external collaborator; this binary exists only so the core's behavior
//! can be exercised end to end by hand).

use clap::Parser;
use netfuse_testserver::TestServer;

#[derive(Parser, Debug)]
#[command(name = "netfuse-testserver", about = "In-memory test double for the netfuse wire protocol")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short = 'p', long, default_value_t = 4096)]
    port: u16,

    /// Pre-shared key clients must present; empty accepts any client that
    /// also passes an empty key.
    #[arg(short = 'k', long, default_value = "")]
    key: String,

    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug { "netfuse_testserver=debug" } else { "netfuse_testserver=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let server = match TestServer::bind((cli.host.as_str(), cli.port), &cli.key).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("failed to bind {}:{}: {e}", cli.host, cli.port);
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %server.addr(), "netfuse-testserver listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(%e, "failed to wait for ctrl-c, shutting down anyway");
    }
    tracing::info!("shutting down");
    server.shutdown();
    std::process::ExitCode::SUCCESS
}
