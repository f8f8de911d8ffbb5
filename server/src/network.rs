//! Server network layer: UDP request handling and event fan-out

use crate::auth::CredentialCheck;
use crate::connections::{ConnectionTable, CONNECTION_TIMEOUT};
use crate::game::Game;
use crate::utils::join_url;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{AdminCommand, GuessReport, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, RwLock};

/// Receive buffer size; no UDP datagram is larger
pub const RECV_BUFFER_SIZE: usize = 65536;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    MalformedPacket { addr: SocketAddr },
    ConnectionExpired { conn_id: u32 },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

/// Transport settings that are not part of the game itself
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_connections: usize,
    pub join_base_url: String,
    pub connection_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 32,
            join_base_url: "http://localhost:3000".to_string(),
            connection_timeout: CONNECTION_TIMEOUT,
        }
    }
}

/// Main server owning the game and coordinating the network tasks
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionTable>>,
    game: Game,
    credentials: Box<dyn CredentialCheck>,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        game: Game,
        credentials: impl CredentialCheck + 'static,
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionTable::new(config.max_connections))),
            game,
            credentials: Box::new(credentials),
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender that can stop [`Server::run`] with [`ServerMessage::Shutdown`]
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            // Largest possible UDP payload, so nothing is ever truncated
            let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let message = match deserialize::<Packet>(&buffer[0..len]) {
                            Ok(packet) => ServerMessage::PacketReceived { packet, addr },
                            Err(e) => {
                                warn!("Failed to deserialize packet from {}: {}", addr, e);
                                ServerMessage::MalformedPacket { addr }
                            }
                        };
                        if let Err(e) = server_tx.send(message) {
                            error!("Failed to send packet to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let addrs = connections.read().await.addrs();
                        for addr in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to push to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drops connections gone silent
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.connection_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let expired = connections.write().await.expire(timeout);
                for conn_id in expired {
                    if let Err(e) = server_tx.send(ServerMessage::ConnectionExpired { conn_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    /// Spawns task that pushes every published game event to all clients
    fn spawn_event_forwarder(&self) {
        let mut events = self.game.subscribe();
        let game_tx = self.game_tx.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let packet = Packet::Event { event };
                        if game_tx
                            .send(GameMessage::BroadcastPacket { packet })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event forwarder lagged, {} events dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Processes one incoming packet against the game
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            self.handle_connect(client_version, addr).await;
            return;
        }

        let known = self.connections.write().await.touch(addr).map(|conn| conn.id);
        let Some(conn_id) = known else {
            warn!("Ignoring packet from unconnected peer {}", addr);
            return;
        };

        match packet {
            Packet::Heartbeat => {}

            Packet::Disconnect => {
                self.connections.write().await.close(addr);
            }

            Packet::AdminLogin { username, password } => {
                let success = self.credentials.verify(&username, &password);
                if success {
                    info!("Connection {} logged in as admin", conn_id);
                } else {
                    warn!("Failed admin login from connection {}", conn_id);
                }
                if let Some(conn) = self.connections.write().await.touch(addr) {
                    conn.is_admin = success;
                }
                self.send_packet(Packet::AdminLoginResult { success }, addr);
            }

            Packet::Admin(command) => {
                let is_admin = self.connections.read().await.is_admin(addr);
                let response = if is_admin {
                    handle_admin_command(&mut self.game, command, &self.config.join_base_url)
                } else {
                    warn!("Connection {} sent admin command without login", conn_id);
                    Packet::Rejected {
                        reason: "Admin login required".to_string(),
                    }
                };
                self.send_packet(response, addr);
            }

            Packet::Join { key, name } => {
                let result = self.game.join(&key, &name);
                match &result {
                    Ok(player) => {
                        if let Some(conn) = self.connections.write().await.touch(addr) {
                            conn.player_id = Some(player.id);
                        }
                    }
                    Err(e) => info!("Connection {} failed to join: {}", conn_id, e),
                }
                self.send_packet(Packet::JoinResult { result }, addr);
            }

            Packet::Guess { player_id, guess } => {
                let result = self.game.submit_guess(player_id, guess);
                let report = GuessReport::from(&result);
                match report.event {
                    Some(line) => debug!("Activity: {}", line),
                    None => debug!(
                        "Guess from connection {} rejected: {}",
                        conn_id, report.message
                    ),
                }
                self.send_packet(Packet::GuessResult { result }, addr);
            }

            Packet::QuerySnapshot => {
                let snapshot = self.game.snapshot();
                self.send_packet(Packet::SnapshotData { snapshot }, addr);
            }

            _ => {
                warn!("Unexpected packet type from {}", addr);
            }
        }
    }

    /// Tells a connected peer its datagram could not be decoded, so it is
    /// not left waiting for a reply. Unknown peers are ignored.
    async fn handle_malformed(&mut self, addr: SocketAddr) {
        if self.connections.write().await.touch(addr).is_some() {
            self.send_packet(
                Packet::Rejected {
                    reason: "Malformed packet".to_string(),
                },
                addr,
            );
        }
    }

    async fn handle_connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!("Peer {} connecting (version: {})", addr, client_version);

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        let response = match self.connections.write().await.open(addr) {
            Some(client_id) => Packet::Connected { client_id },
            None => Packet::Disconnected {
                reason: "Server full".to_string(),
            },
        };
        self.send_packet(response, addr);
    }

    /// Main server loop; returns after a shutdown request
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();
        self.spawn_event_forwarder();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::MalformedPacket { addr } => {
                    self.handle_malformed(addr).await;
                }
                ServerMessage::ConnectionExpired { conn_id } => {
                    info!("Connection {} timed out", conn_id);
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Applies an admin command to the game and builds the reply
pub fn handle_admin_command(
    game: &mut Game,
    command: AdminCommand,
    join_base_url: &str,
) -> Packet {
    match command {
        AdminCommand::UpdateSettings(update) => game.update_settings(update),
        AdminCommand::GenerateKey => {
            let key = game.generate_key();
            let join_url = join_url(join_base_url, &key);
            return Packet::KeyGenerated { key, join_url };
        }
        AdminCommand::StartGame => game.start_game(),
        AdminCommand::StopGame => game.stop_game(),
        AdminCommand::ClearLobby => game.clear_lobby(),
        AdminCommand::ResetLeaderboard => game.reset_leaderboard(),
        AdminCommand::RemovePlayer { id } => game.remove_player(id),
    }
    Packet::AdminAck
}
