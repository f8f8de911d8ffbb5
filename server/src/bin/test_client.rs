//! Scripted smoke client: logs in as admin, opens a session, joins one
//! player and binary-searches the hidden number until it wins.

use bincode::{deserialize, serialize};
use shared::{AdminCommand, GuessOutcome, Hint, Packet, PROTOCOL_VERSION, SECRET_MAX, SECRET_MIN};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn send(
    socket: &UdpSocket,
    server: SocketAddr,
    packet: &Packet,
) -> Result<(), Box<dyn std::error::Error>> {
    socket.send_to(&serialize(packet)?, server).await?;
    Ok(())
}

// Waits for the next direct reply, printing pushed events on the way
async fn reply(socket: &UdpSocket) -> Result<Packet, Box<dyn std::error::Error>> {
    let mut buf = vec![0u8; 65536];
    loop {
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await??;
        match deserialize::<Packet>(&buf[..len])? {
            Packet::Event { event } => println!("  event: {:?}", event),
            other => return Ok(other),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let server = "127.0.0.1:8080".parse::<SocketAddr>()?;

    send(&socket, server, &Packet::Connect { client_version: PROTOCOL_VERSION }).await?;
    println!("Connect -> {:?}", reply(&socket).await?);

    let login = Packet::AdminLogin {
        username: "admin".to_string(),
        password: "1234".to_string(),
    };
    send(&socket, server, &login).await?;
    println!("AdminLogin -> {:?}", reply(&socket).await?);

    send(&socket, server, &Packet::Admin(AdminCommand::GenerateKey)).await?;
    let key = match reply(&socket).await? {
        Packet::KeyGenerated { key, join_url } => {
            println!("Session key {} ({})", key, join_url);
            key
        }
        other => {
            println!("Expected KeyGenerated but got: {:?}", other);
            return Ok(());
        }
    };

    let join = Packet::Join {
        key,
        name: "test-bot".to_string(),
    };
    send(&socket, server, &join).await?;
    let player_id = match reply(&socket).await? {
        Packet::JoinResult { result: Ok(player) } => player.id,
        other => {
            println!("Join failed: {:?}", other);
            return Ok(());
        }
    };

    send(&socket, server, &Packet::Admin(AdminCommand::StartGame)).await?;
    println!("StartGame -> {:?}", reply(&socket).await?);

    let (mut low, mut high) = (i64::from(SECRET_MIN), i64::from(SECRET_MAX));
    loop {
        let guess = (low + high) / 2;
        send(&socket, server, &Packet::Guess { player_id, guess }).await?;

        let outcome = match reply(&socket).await? {
            Packet::GuessResult { result: Ok(outcome) } => outcome,
            other => {
                println!("Guess failed: {:?}", other);
                break;
            }
        };
        println!("Guess {} -> {}", guess, outcome.message());

        match outcome {
            GuessOutcome::Win { attempts, .. } => {
                println!("Won after {} attempts", attempts);
                break;
            }
            // A restart means a new number; search from scratch
            GuessOutcome::Continue { restarted: true, .. } => {
                low = i64::from(SECRET_MIN);
                high = i64::from(SECRET_MAX);
            }
            GuessOutcome::Continue { hint: Some(Hint::Greater), .. } => low = guess + 1,
            GuessOutcome::Continue { hint: Some(Hint::Smaller), .. } => high = guess - 1,
            GuessOutcome::Continue { hint: None, .. } => {}
        }
    }

    send(&socket, server, &Packet::Disconnect).await?;
    println!("Test client finished");

    Ok(())
}
