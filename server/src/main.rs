use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::lobby::Lobby;
use server::network::NetworkServer;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Newline-delimited word list
    #[arg(short, long, default_value = "assets/words.txt")]
    words: PathBuf,

    /// Scored attempts per match (must be even)
    #[arg(short, long, default_value = "6")]
    max_guesses: u32,

    /// Seconds the active player has to guess
    #[arg(short, long, default_value = "30")]
    think_time: u64,

    /// Maximum number of players waiting for a match
    #[arg(short, long, default_value = "100")]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        word_list_path: args.words,
        max_guesses: args.max_guesses,
        think_time: Duration::from_secs(args.think_time),
        queue_capacity: args.queue_capacity,
        ..ServerConfig::default()
    };
    config.validate()?;

    let word_list = config.load_word_list()?;

    info!("Starting server...");
    info!(
        "Max guesses: {}, think time: {}s, queue capacity: {}",
        config.max_guesses,
        config.think_time.as_secs(),
        config.queue_capacity
    );

    let lobby = Lobby::start(config, word_list);
    let server = NetworkServer::bind(lobby).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
