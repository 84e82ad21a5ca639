use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod serve;

const USAGE: &str = "sshdav ssh://foo@example.com:22/home/foo http://127.0.0.1:8080/";

#[derive(Parser, Debug)]
#[command(
    name = "sshdav",
    version,
    about = "WebDAV server for SSH",
    override_usage = USAGE
)]
pub(crate) struct Cli {
    /// Remote directory, ssh://[user@]host[:port][/path]
    #[arg(value_name = "SSH_URL")]
    pub ssh_url: String,

    /// Local listener, http://host[:port][/prefix]
    #[arg(value_name = "WEBDAV_URL")]
    pub webdav_url: String,

    /// ssh config file
    #[arg(short = 'F', long, value_name = "FILE")]
    pub ssh_config: Option<String>,

    /// ssh identity file (private key)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub ssh_identity: Option<String>,

    /// ssh option (KEY=VALUE), may be repeated
    #[arg(short = 'o', long, value_name = "KEY=VALUE")]
    pub ssh_option: Vec<String>,

    /// ssh binary to run
    #[arg(long, env = "SSHDAV_SSH", value_name = "PATH")]
    pub ssh_program: Option<String>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long)]
    pub debug: bool,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match serve::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sshdav: {e}");
            ExitCode::FAILURE
        }
    }
}
