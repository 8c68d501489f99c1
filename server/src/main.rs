use clap::Parser;
use log::info;
use server::{Server, ServerConfig};
use shared::{DEFAULT_NAMES, DEFAULT_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Interface to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value_t = DEFAULT_NAMES.len())]
    max_clients: usize,

    /// Display names handed out to clients, comma separated
    #[arg(short, long, value_delimiter = ',', default_values_t = DEFAULT_NAMES.map(String::from))]
    names: Vec<String>,

    /// Longest single wait for socket readiness, in milliseconds
    #[arg(long, default_value = "500")]
    poll_timeout_ms: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            max_clients: args.max_clients,
            names: args.names,
            poll_timeout: Duration::from_millis(args.poll_timeout_ms),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!("Starting chat server on {}:{}", config.host, config.port);
    info!("Names: {}", config.names.join(", "));

    let mut server = Server::bind(&config)?;
    server.run()?;

    Ok(())
}
