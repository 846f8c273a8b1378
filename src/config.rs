use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::piece::PieceKind;
use crate::readiness::DEFAULT_CONNECTION_WAIT_TIMEOUT;
use crate::replay::DEFAULT_STEP_INTERVAL;


#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    // Message broker WebSocket endpoint.
    pub server_url: String,
    // Base of the REST API; games are fetched from `{api_url}/games/{id}`.
    pub api_url: String,
    #[serde(with = "humantime_serde")]
    pub replay_step_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub connection_wait_timeout: Duration,
    // Piece a pawn is promoted to when it reaches the last rank. The user is never asked.
    pub auto_promotion: PieceKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "ws://localhost:8080/ws/websocket".to_owned(),
            api_url: "http://localhost:8080/api".to_owned(),
            replay_step_interval: DEFAULT_STEP_INTERVAL,
            connection_wait_timeout: DEFAULT_CONNECTION_WAIT_TIMEOUT,
            auto_promotion: PieceKind::Queen,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.auto_promotion.can_be_promotion_target() {
            return Err(format!("cannot promote to {:?}", self.auto_promotion));
        }
        if self.replay_step_interval.is_zero() {
            return Err("replay step interval must be positive".to_owned());
        }
        Ok(())
    }

    pub fn game_url(&self, game_id: crate::game::GameId) -> String {
        format!("{}/games/{game_id}", self.api_url.trim_end_matches('/'))
    }
}
