// Application-level protocol: channel names and the JSON bodies exchanged on them.

use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::game::{Game, GameId, GameResult, MoveRecord};


pub const GAME_STATE_QUEUE: &str = "/user/queue/game-state";
pub const PRESENCE_CONNECT_DESTINATION: &str = "/app/presence/connect";
pub const PRESENCE_DISCONNECT_DESTINATION: &str = "/app/presence/disconnect";

pub fn moves_topic(game_id: GameId) -> String { format!("/topic/game/{game_id}/moves") }
pub fn status_topic(game_id: GameId) -> String { format!("/topic/game/{game_id}/status") }

fn game_destination(game_id: GameId, action: &str) -> String {
    format!("/app/game/{game_id}/{action}")
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct UsernamePayload {
    pub username: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EndGamePayload {
    pub result: GameResult,
    pub reason: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StatusPayload {
    pub game: Game,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ClientEvent {
    Join { game_id: GameId, username: String },
    MakeMove(MoveRecord),
    EndGame { game_id: GameId, result: GameResult, reason: String },
    PresenceConnect { username: String },
    PresenceDisconnect { username: String },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ServerEvent {
    MoveMade(MoveRecord),
    StatusChanged { game: Game, reason: Option<String> },
    GameState(Game),
}

// Inbound channels of one game session. Used as the subscription handler: it knows how to decode
// the bodies that arrive on its channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ServerChannel {
    Moves,
    Status,
    GameState,
}

impl ClientEvent {
    pub fn destination(&self) -> String {
        match self {
            ClientEvent::Join { game_id, .. } => game_destination(*game_id, "join"),
            ClientEvent::MakeMove(record) => game_destination(record.game_id, "move"),
            ClientEvent::EndGame { game_id, .. } => game_destination(*game_id, "end"),
            ClientEvent::PresenceConnect { .. } => PRESENCE_CONNECT_DESTINATION.to_owned(),
            ClientEvent::PresenceDisconnect { .. } => PRESENCE_DISCONNECT_DESTINATION.to_owned(),
        }
    }

    pub fn body(&self) -> Result<String, serde_json::Error> {
        match self {
            ClientEvent::Join { username, .. }
            | ClientEvent::PresenceConnect { username }
            | ClientEvent::PresenceDisconnect { username } => {
                serde_json::to_string(&UsernamePayload { username: username.clone() })
            }
            ClientEvent::MakeMove(record) => serde_json::to_string(record),
            ClientEvent::EndGame { result, reason, .. } => {
                serde_json::to_string(&EndGamePayload { result: *result, reason: reason.clone() })
            }
        }
    }
}

impl ServerChannel {
    pub fn all() -> [ServerChannel; 3] {
        [ServerChannel::Moves, ServerChannel::Status, ServerChannel::GameState]
    }

    pub fn topic(self, game_id: GameId) -> String {
        match self {
            ServerChannel::Moves => moves_topic(game_id),
            ServerChannel::Status => status_topic(game_id),
            ServerChannel::GameState => GAME_STATE_QUEUE.to_owned(),
        }
    }

    pub fn decode(self, body: &str) -> Result<ServerEvent, EventError> {
        let parse_error = |err: serde_json::Error| EventError::CannotParse(err.to_string());
        Ok(match self {
            ServerChannel::Moves => {
                ServerEvent::MoveMade(serde_json::from_str(body).map_err(parse_error)?)
            }
            ServerChannel::Status => {
                let StatusPayload { game, reason } =
                    serde_json::from_str(body).map_err(parse_error)?;
                ServerEvent::StatusChanged { game, reason }
            }
            ServerChannel::GameState => {
                ServerEvent::GameState(serde_json::from_str(body).map_err(parse_error)?)
            }
        })
    }
}

impl ServerEvent {
    pub fn game_id(&self) -> GameId {
        match self {
            ServerEvent::MoveMade(record) => record.game_id,
            ServerEvent::StatusChanged { game, .. } => game.id,
            ServerEvent::GameState(game) => game.id,
        }
    }
}
