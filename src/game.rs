// Game aggregate as the server describes it. Field names follow the wire protocol.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::force::Force;
use crate::piece::PieceKind;
use crate::position::Termination;


pub type GameId = u64;
pub type UserId = u64;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    WhiteWon,
    BlackWon,
    Draw,
    Abandoned,
}

// Result reported upstream when the game ends on this client (termination or resignation).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    White,
    Black,
    Draw,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: UserId,
    pub username: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub game_id: GameId,
    pub from: Coord,
    pub to: Coord,
    pub piece: PieceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
    pub fen_after: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub san_notation: Option<String>,
    // 1-based.
    pub move_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_color: Option<Force>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub white_player: PlayerInfo,
    pub black_player: PlayerInfo,
    pub status: GameStatus,
    pub current_turn: Force,
    pub current_fen: String,
    #[serde(default)]
    pub moves: Vec<MoveRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl GameStatus {
    pub fn is_active(self) -> bool { self == GameStatus::InProgress }
    pub fn is_terminal(self) -> bool { !self.is_active() }

    pub fn winner(self) -> Option<Force> {
        match self {
            GameStatus::WhiteWon => Some(Force::White),
            GameStatus::BlackWon => Some(Force::Black),
            GameStatus::InProgress | GameStatus::Draw | GameStatus::Abandoned => None,
        }
    }
}

impl GameResult {
    pub fn victory(winner: Force) -> Self {
        match winner {
            Force::White => GameResult::White,
            Force::Black => GameResult::Black,
        }
    }

    pub fn from_termination(termination: Termination) -> Self {
        match termination {
            Termination::Checkmate { winner } => GameResult::victory(winner),
            Termination::Draw(_) => GameResult::Draw,
        }
    }
}

impl MoveRecord {
    // The side that made the move: explicit on the record when present, otherwise implied by the
    // move number.
    pub fn force(&self) -> Force {
        self.player_color.unwrap_or_else(|| Force::of_move_number(self.move_number))
    }

    // Notation shown in the move list. Falls back to "e2e4" when the server did not provide SAN.
    pub fn display_notation(&self) -> String {
        match &self.san_notation {
            Some(san) => san.clone(),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl Game {
    pub fn is_active(&self) -> bool { self.status.is_active() }

    pub fn player(&self, force: Force) -> &PlayerInfo {
        match force {
            Force::White => &self.white_player,
            Force::Black => &self.black_player,
        }
    }

    pub fn force_of_user(&self, user_id: UserId) -> Option<Force> {
        if self.white_player.id == user_id {
            Some(Force::White)
        } else if self.black_player.id == user_id {
            Some(Force::Black)
        } else {
            None
        }
    }

    pub fn last_move(&self) -> Option<&MoveRecord> { self.moves.last() }
    pub fn num_moves(&self) -> usize { self.moves.len() }
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_server_game() {
        let json = r#"{
            "id": 7,
            "whitePlayer": {"id": 1, "username": "alice"},
            "blackPlayer": {"id": 2, "username": "bob"},
            "status": "IN_PROGRESS",
            "currentTurn": "black",
            "currentFen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            "moves": [{
                "gameId": 7,
                "from": "e2",
                "to": "e4",
                "piece": "p",
                "fenAfter": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
                "sanNotation": "e4",
                "moveNumber": 1,
                "playerColor": "white"
            }],
            "createdAt": "2024-03-01T10:00:00",
            "updatedAt": "2024-03-01T10:00:05"
        }"#;
        let game: Game = serde_json::from_str(json).unwrap();
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.current_turn, Force::Black);
        assert_eq!(game.moves[0].from, Coord::E2);
        assert_eq!(game.moves[0].piece, PieceKind::Pawn);
        assert_eq!(game.moves[0].promotion, None);
        assert_eq!(game.force_of_user(2), Some(Force::Black));
        assert_eq!(game.force_of_user(3), None);
    }

    #[test]
    fn move_record_wire_names() {
        let record = MoveRecord {
            game_id: 1,
            from: Coord::A7,
            to: Coord::A8,
            piece: PieceKind::Pawn,
            promotion: Some(PieceKind::Queen),
            fen_after: "Q6k/8/8/8/8/8/8/K7 b - - 0 1".to_owned(),
            san_notation: None,
            move_number: 9,
            player_color: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["gameId"], 1);
        assert_eq!(value["promotion"], "q");
        assert_eq!(value["fenAfter"], "Q6k/8/8/8/8/8/8/K7 b - - 0 1");
        assert_eq!(value["moveNumber"], 9);
        assert!(value.get("sanNotation").is_none());
        assert_eq!(record.force(), Force::White);
        assert_eq!(record.display_notation(), "a7a8");
    }

    #[test]
    fn status_names() {
        assert_eq!(serde_json::to_string(&GameStatus::WhiteWon).unwrap(), r#""WHITE_WON""#);
        assert_eq!(serde_json::to_string(&GameResult::Draw).unwrap(), r#""draw""#);
        assert!(GameStatus::Abandoned.is_terminal());
        assert_eq!(GameStatus::BlackWon.winner(), Some(Force::Black));
    }
}
