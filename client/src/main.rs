//! Entry point: parse flags, layer config, connect, mount (spec §6).

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use fuser::MountOption;

use netfuse::cli::Cli;
use netfuse::client::Client;
use netfuse::config::Config;
use netfuse::fs::{FsWrapper, RemoteFS};
use netfuse::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(&cli);
    logging::init(config.debug);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match runtime.block_on(Client::connect(&config.host, config.port, &config.psk, config.cache_enabled)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to connect to {}:{}: {e}", config.host, config.port);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(host = %config.host, port = config.port, mountpoint = %cli.mountpoint, "mounting");

    let remote_fs = RemoteFS::new(client, runtime, config);
    let wrapper = FsWrapper(Arc::new(Mutex::new(remote_fs)));

    let options = vec![MountOption::AutoUnmount, MountOption::FSName("netfuse".to_string())];
    if let Err(e) = fuser::mount2(wrapper, &cli.mountpoint, &options) {
        eprintln!("failed to mount filesystem: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
