//! Command-line surface (spec §6), mirroring the original's `argparse`
//! flags one for one.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "netfuse", about = "Mount a remote directory tree served over a length-framed TCP protocol")]
pub struct Cli {
    /// Local directory to mount the remote tree on.
    pub mountpoint: String,

    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(short = 'p', long, default_value_t = 4096)]
    pub port: u16,

    /// Pre-shared key, hashed before being sent to the server.
    #[arg(short = 'k', long, default_value = "")]
    pub key: String,

    /// Defaults to the current process's uid when omitted.
    #[arg(short = 'u', long)]
    pub uid: Option<u32>,

    /// Defaults to the current process's gid when omitted.
    #[arg(short = 'g', long)]
    pub gid: Option<u32>,

    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Disable the readdir freshness cache; every `readdir` hits the wire.
    #[arg(long)]
    pub nocache: bool,

    #[arg(long, default_value = "config.toml")]
    pub config: String,
}
