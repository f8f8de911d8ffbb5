use clap::Parser;
use log::{error, info};
use server::auth::StaticCredentials;
use server::game::Game;
use server::network::{Server, ServerConfig, ServerMessage};
use server::secret::RandomSource;
use shared::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of live connections (players and observers)
    #[arg(long, default_value = "32")]
    max_connections: usize,

    /// Initial player cap for the lobby
    #[arg(long, default_value_t = shared::DEFAULT_MAX_PLAYERS)]
    max_players: u32,

    /// Initial guesses per player before a personal restart
    #[arg(short, long, default_value_t = shared::DEFAULT_CHANCES_PER_PLAYER)]
    chances: u32,

    /// Admin username
    #[arg(long, default_value = "admin")]
    admin_user: String,

    /// Admin password
    #[arg(long, default_value = "1234")]
    admin_pass: String,

    /// Base URL of the page players open to join
    #[arg(long, default_value = "http://localhost:3000")]
    join_base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let settings = Settings {
        max_players: args.max_players,
        chances_per_player: args.chances,
        ..Settings::default()
    };
    let game = Game::new(settings, &args.admin_user, RandomSource::new());
    let credentials = StaticCredentials::new(args.admin_user, args.admin_pass);
    info!("Admin account: {}", credentials.username());
    let config = ServerConfig {
        max_connections: args.max_connections,
        join_base_url: args.join_base_url,
        ..ServerConfig::default()
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, game, credentials, config).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                let _ = shutdown.send(ServerMessage::Shutdown);
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
