//! Typed command lines for the terminal client
//!
//! Each line the user types becomes one [`Command`]. Most map straight onto a
//! request packet; `join` and `guess` need the client's own state (default
//! name, joined player id) and are resolved by the network layer.

use shared::{AdminCommand, Packet, PlayerId, SettingsUpdate};

pub const HELP: &str = "\
commands:
  join <key> [name]           join the lobby with a session key
  guess <n>                   guess for the player you joined as
  guess <player-id> <n>       guess for any player id
  state                       fetch the current snapshot
  login <user> <password>     log in as admin
  key                         (admin) generate a session key
  set [max=N] [chances=N] [key=K]
                              (admin) update settings
  start | stop                (admin) start or stop the round
  remove <player-id>          (admin) remove a player
  clear                       (admin) empty the lobby
  reset-board                 (admin) reset the leaderboard
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Packet),
    Join { key: String, name: Option<String> },
    Guess { player_id: Option<PlayerId>, guess: i64 },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("not a number: {0}")]
    InvalidNumber(String),
    #[error("invalid setting: {0} (expected max=N, chances=N or key=K)")]
    InvalidSetting(String),
    #[error("join a game first or pass a player id")]
    NotJoined,
    #[error("no player name given and no --name default")]
    MissingName,
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = words.collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "state" => Command::Send(Packet::QuerySnapshot),
        "login" => Command::Send(Packet::AdminLogin {
            username: arg(&args, 0, "user")?.to_string(),
            password: arg(&args, 1, "password")?.to_string(),
        }),
        "key" => admin(AdminCommand::GenerateKey),
        "start" => admin(AdminCommand::StartGame),
        "stop" => admin(AdminCommand::StopGame),
        "clear" => admin(AdminCommand::ClearLobby),
        "reset-board" => admin(AdminCommand::ResetLeaderboard),
        "remove" => admin(AdminCommand::RemovePlayer {
            id: PlayerId(number(arg(&args, 0, "player-id")?)?),
        }),
        "set" => admin(AdminCommand::UpdateSettings(parse_settings(&args)?)),
        "join" => Command::Join {
            key: arg(&args, 0, "key")?.to_string(),
            name: (args.len() > 1).then(|| args[1..].join(" ")),
        },
        "guess" => match args.as_slice() {
            [guess] => Command::Guess {
                player_id: None,
                guess: number(guess)?,
            },
            [id, guess] => Command::Guess {
                player_id: Some(PlayerId(number(id)?)),
                guess: number(guess)?,
            },
            _ => return Err(CommandError::MissingArgument("n")),
        },
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(command)
}

/// Turns a parsed command into the packet to send, filling in the joined
/// player id and default name. `Help` and `Quit` produce no packet.
pub fn to_packet(
    command: Command,
    player_id: Option<PlayerId>,
    default_name: Option<&str>,
) -> Result<Option<Packet>, CommandError> {
    let packet = match command {
        Command::Send(packet) => packet,
        Command::Join { key, name } => {
            let name = name
                .or_else(|| default_name.map(str::to_string))
                .ok_or(CommandError::MissingName)?;
            Packet::Join { key, name }
        }
        Command::Guess {
            player_id: explicit,
            guess,
        } => Packet::Guess {
            player_id: explicit.or(player_id).ok_or(CommandError::NotJoined)?,
            guess,
        },
        Command::Help | Command::Quit => return Ok(None),
    };
    Ok(Some(packet))
}

fn admin(command: AdminCommand) -> Command {
    Command::Send(Packet::Admin(command))
}

fn arg<'a>(args: &[&'a str], index: usize, name: &'static str) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or(CommandError::MissingArgument(name))
}

fn number<T: std::str::FromStr>(text: &str) -> Result<T, CommandError> {
    text.parse()
        .map_err(|_| CommandError::InvalidNumber(text.to_string()))
}

fn parse_settings(args: &[&str]) -> Result<SettingsUpdate, CommandError> {
    let mut update = SettingsUpdate::default();
    for pair in args {
        match pair.split_once('=') {
            Some(("max", value)) => update.max_players = Some(number(value)?),
            Some(("chances", value)) => update.chances_per_player = Some(number(value)?),
            Some(("key", value)) => update.session_key = Some(value.to_string()),
            _ => return Err(CommandError::InvalidSetting(pair.to_string())),
        }
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_empty_line() {
        assert_eq!(assert_err!(parse_command("   ")), CommandError::Empty);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_command("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_guess_for_own_player() {
        assert_eq!(
            assert_ok!(parse_command("guess 42")),
            Command::Guess {
                player_id: None,
                guess: 42
            }
        );
    }

    #[test]
    fn test_guess_for_explicit_player() {
        assert_eq!(
            assert_ok!(parse_command("guess 3 -7")),
            Command::Guess {
                player_id: Some(PlayerId(3)),
                guess: -7
            }
        );
    }

    #[test]
    fn test_guess_rejects_garbage() {
        assert_eq!(
            parse_command("guess lots"),
            Err(CommandError::InvalidNumber("lots".to_string()))
        );
        assert_eq!(
            parse_command("guess"),
            Err(CommandError::MissingArgument("n"))
        );
    }

    #[test]
    fn test_join_with_multi_word_name() {
        assert_eq!(
            parse_command("join ABC1234 Ada Lovelace").unwrap(),
            Command::Join {
                key: "ABC1234".to_string(),
                name: Some("Ada Lovelace".to_string())
            }
        );
        assert_eq!(
            parse_command("join ABC1234").unwrap(),
            Command::Join {
                key: "ABC1234".to_string(),
                name: None
            }
        );
    }

    #[test]
    fn test_login_needs_both_fields() {
        assert_eq!(
            parse_command("login admin"),
            Err(CommandError::MissingArgument("password"))
        );
        match parse_command("login admin 1234").unwrap() {
            Command::Send(Packet::AdminLogin { username, password }) => {
                assert_eq!(username, "admin");
                assert_eq!(password, "1234");
            }
            other => panic!("Unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_admin_shortcuts() {
        assert_eq!(
            parse_command("START").unwrap(),
            Command::Send(Packet::Admin(AdminCommand::StartGame))
        );
        assert_eq!(
            parse_command("remove 5").unwrap(),
            Command::Send(Packet::Admin(AdminCommand::RemovePlayer { id: PlayerId(5) }))
        );
    }

    #[test]
    fn test_set_settings() {
        let command = parse_command("set max=3 chances=7 key=XYZ").unwrap();
        assert_eq!(
            command,
            Command::Send(Packet::Admin(AdminCommand::UpdateSettings(SettingsUpdate {
                session_key: Some("XYZ".to_string()),
                max_players: Some(3),
                chances_per_player: Some(7),
            })))
        );

        assert_eq!(
            parse_command("set size=3"),
            Err(CommandError::InvalidSetting("size=3".to_string()))
        );
    }

    #[test]
    fn test_guess_needs_a_player() {
        let command = parse_command("guess 10").unwrap();
        assert_eq!(
            to_packet(command.clone(), None, None),
            Err(CommandError::NotJoined)
        );
        assert_eq!(
            to_packet(command, Some(PlayerId(2)), None).unwrap(),
            Some(Packet::Guess {
                player_id: PlayerId(2),
                guess: 10
            })
        );
    }

    #[test]
    fn test_join_falls_back_to_default_name() {
        let command = parse_command("join KEY").unwrap();
        assert_eq!(
            to_packet(command.clone(), None, None),
            Err(CommandError::MissingName)
        );
        assert_eq!(
            to_packet(command, None, Some("ada")).unwrap(),
            Some(Packet::Join {
                key: "KEY".to_string(),
                name: "ada".to_string()
            })
        );
    }

    #[test]
    fn test_help_and_quit_send_nothing() {
        assert_eq!(to_packet(Command::Help, None, None), Ok(None));
        assert_eq!(to_packet(Command::Quit, None, None), Ok(None));
    }
}
