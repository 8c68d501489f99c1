use clap::Parser;
use client::network::ChatClient;
use log::info;
use shared::DEFAULT_PORT;
use tokio::io::{stdin, stdout, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Type a line and press Enter to send it to everyone");

    let mut client = ChatClient::connect(&args.server).await?;
    client.run(BufReader::new(stdin()), stdout()).await?;

    if client.was_rejected() {
        info!("Disconnected: server was full");
    }

    Ok(())
}
