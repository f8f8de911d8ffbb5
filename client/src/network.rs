use crate::commands::{parse_command, to_packet, Command, HELP};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{GameEvent, GuessOutcome, Packet, PlayerId, Snapshot, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,

    player_id: Option<PlayerId>,
    default_name: Option<String>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        default_name: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            player_id: None,
            default_name,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                // Events are never replayed, so start from a fresh snapshot
                if let Err(e) = self.send_packet(&Packet::QuerySnapshot).await {
                    error!("Error requesting snapshot: {}", e);
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                println!("disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            Packet::AdminLoginResult { success } => {
                println!(
                    "{}",
                    if success {
                        "logged in as admin"
                    } else {
                        "invalid credentials"
                    }
                );
            }

            Packet::AdminAck => println!("ok"),

            Packet::KeyGenerated { key, join_url } => {
                println!("session key: {}  (join at {})", key, join_url);
            }

            Packet::JoinResult { result } => match result {
                Ok(player) => {
                    println!(
                        "joined as {} (id {}), {} chances",
                        player.name, player.id, player.chances_left
                    );
                    self.player_id = Some(player.id);
                }
                Err(e) => println!("join failed: {}", e),
            },

            Packet::GuessResult { result } => match result {
                Ok(outcome) => println!("{}", describe_outcome(&outcome)),
                Err(e) => println!("guess failed: {}", e),
            },

            Packet::SnapshotData { snapshot } => println!("{}", describe_snapshot(&snapshot)),

            Packet::Rejected { reason } => println!("rejected: {}", reason),

            Packet::Event { event } => println!("* {}", describe_event(&event)),

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Handles one typed line. Returns false when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(crate::commands::CommandError::Empty) => return true,
            Err(e) => {
                println!("{}", e);
                return true;
            }
        };

        match command {
            Command::Quit => return false,
            Command::Help => {
                println!("{}", HELP);
                return true;
            }
            _ => {}
        }

        if !self.connected {
            println!("not connected yet");
            return true;
        }

        match to_packet(command, self.player_id, self.default_name.as_deref()) {
            Ok(Some(packet)) => {
                if let Err(e) = self.send_packet(&packet).await {
                    error!("Error sending request: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
        true
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        let mut lines = BufReader::new(stdin()).lines();
        let mut buffer = vec![0u8; 65536];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet).await;
                            } else {
                                warn!("Failed to deserialize packet from server");
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.handle_line(&line).await {
                                break;
                            }
                        }
                        None => break,
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.connected {
                        if let Err(e) = self.send_packet(&Packet::Heartbeat).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}

pub fn describe_outcome(outcome: &GuessOutcome) -> String {
    match outcome {
        GuessOutcome::Win {
            message, number, ..
        } => format!("{} The number was {}. Round over.", message, number),
        GuessOutcome::Continue {
            message,
            chances_left,
            ..
        } => format!("{} ({} chances left)", message, chances_left),
    }
}

pub fn describe_event(event: &GameEvent) -> String {
    match event {
        GameEvent::SettingsUpdated { settings } => format!(
            "settings updated: max {} players, {} chances",
            settings.max_players, settings.chances_per_player
        ),
        GameEvent::KeyGenerated { key } => format!("new session key {}", key),
        GameEvent::PlayerJoined { player } => {
            format!("{} joined (id {})", player.name, player.id)
        }
        GameEvent::PlayerRemoved { id } => format!("player {} removed", id),
        GameEvent::GameStarted => "game started".to_string(),
        GameEvent::GameStopped => "game stopped".to_string(),
        GameEvent::LobbyCleared => "lobby cleared".to_string(),
        GameEvent::LeaderboardReset => "leaderboard reset".to_string(),
        GameEvent::PlayerGuess {
            name, guess, hint, ..
        } => format!("{} guessed {}: {}", name, guess, hint),
        GameEvent::PersonalRestart { name, .. } => {
            format!("{}'s personal game restarted", name)
        }
        GameEvent::PlayerWon {
            name,
            attempts,
            number,
            ..
        } => format!(
            "{} won the game in {} attempts, the number was {}",
            name, attempts, number
        ),
    }
}

pub fn describe_snapshot(snapshot: &Snapshot) -> String {
    let mut out = format!(
        "game {}{}, key {:?}, max {} players, {} chances",
        if snapshot.started { "running" } else { "stopped" },
        if snapshot.stopped_by.is_empty() {
            String::new()
        } else {
            format!(" (won by {})", snapshot.stopped_by)
        },
        snapshot.settings.session_key,
        snapshot.settings.max_players,
        snapshot.settings.chances_per_player,
    );

    for player in &snapshot.players {
        out.push_str(&format!(
            "\n  [{}] {} - {} chances left",
            player.id, player.name, player.chances_left
        ));
    }

    let mut board: Vec<_> = snapshot.leaderboard.iter().collect();
    board.sort_by(|a, b| b.1.wins.cmp(&a.1.wins).then_with(|| a.0.cmp(b.0)));
    for (name, entry) in board {
        out.push_str(&format!(
            "\n  {}: {} wins, {} attempts",
            name, entry.wins, entry.total_attempts
        ));
    }

    out
}
