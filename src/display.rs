// What the renderer gets: the board to draw, which moves it may offer, history rows and status
// text. Everything here is recomputed from `AlteredGame` on each render.

use itertools::Itertools;

use crate::altered_game::AlteredGame;
use crate::coord::{Col, Coord, NUM_COLS, NUM_ROWS, Row};
use crate::force::Force;
use crate::game::{Game, GameStatus, MoveRecord};
use crate::grid::Grid;
use crate::material::{CapturedPieces, captured_pieces};
use crate::piece::piece_to_pictogram;
use crate::position::{LegalMoveMap, PositionEngine};
use crate::replay::{MoveIndex, ReplayMode};


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoardOrientation {
    Normal,  // White at bottom
    Rotated, // Black at bottom
}

// Board squares in screen terms: row 0 is the top-most row, which could be row '1' or row '8'.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DisplayCoord {
    pub x: u8,
    pub y: u8,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BoardView {
    pub position: String,
    pub board: Grid,
    pub orientation: BoardOrientation,
    pub side_to_move: Force,
    // Empty whenever the user cannot move: not their turn, game over, or replay.
    pub legal_move_map: LegalMoveMap,
    pub last_move: Option<(Coord, Coord)>,
    pub in_check: bool,
    pub captured: CapturedPieces,
    pub replay_mode: ReplayMode,
    pub replay_index: MoveIndex,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HistoryEntry {
    pub index: MoveIndex,
    pub notation: String,
    // Highlighted: the position currently shown in replay.
    pub current: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HistoryRow {
    pub number: usize,
    pub white: HistoryEntry,
    pub black: Option<HistoryEntry>,
}

impl BoardOrientation {
    // Players see their own pieces at the bottom; spectators see white at the bottom.
    pub fn for_force(force: Option<Force>) -> Self {
        match force {
            Some(Force::Black) => BoardOrientation::Rotated,
            Some(Force::White) | None => BoardOrientation::Normal,
        }
    }
}

pub fn to_display_coord(coord: Coord, orientation: BoardOrientation) -> DisplayCoord {
    let x = coord.col.to_zero_based();
    let y = NUM_ROWS - 1 - coord.row.to_zero_based();
    match orientation {
        BoardOrientation::Normal => DisplayCoord { x, y },
        BoardOrientation::Rotated => DisplayCoord { x: NUM_COLS - 1 - x, y: NUM_ROWS - 1 - y },
    }
}

pub fn from_display_coord(coord: DisplayCoord, orientation: BoardOrientation) -> Option<Coord> {
    if coord.x >= NUM_COLS || coord.y >= NUM_ROWS {
        return None;
    }
    let (x, y) = match orientation {
        BoardOrientation::Normal => (coord.x, coord.y),
        BoardOrientation::Rotated => (NUM_COLS - 1 - coord.x, NUM_ROWS - 1 - coord.y),
    };
    Some(Coord::new(Row::from_zero_based(NUM_ROWS - 1 - y), Col::from_zero_based(x)))
}

pub fn board_view<E: PositionEngine>(
    altered_game: &AlteredGame<E>, orientation: BoardOrientation,
) -> BoardView {
    let replay_mode = altered_game.replay_mode();
    let replay_index = altered_game.replay_index();
    if let Some(frame) = altered_game.replay_frame().as_ref() {
        return BoardView {
            position: frame.position.clone(),
            board: frame.board.clone(),
            orientation,
            side_to_move: frame.side_to_move,
            legal_move_map: LegalMoveMap::new(),
            last_move: frame.last_move.as_ref().map(|m| (m.from, m.to)),
            in_check: frame.in_check,
            captured: frame.captured.clone(),
            replay_mode,
            replay_index,
        };
    }
    let game = altered_game.game();
    let board = altered_game.live_position().board();
    BoardView {
        position: game.current_fen.clone(),
        captured: captured_pieces(&board),
        board,
        orientation,
        side_to_move: game.current_turn,
        legal_move_map: altered_game.interactive_moves(),
        last_move: game.last_move().map(|m| (m.from, m.to)),
        in_check: altered_game.in_check(),
        replay_mode,
        replay_index,
    }
}

// Move list grouped in full moves. `current` is the replay index, if replay is active.
pub fn move_history(moves: &[MoveRecord], current: Option<MoveIndex>) -> Vec<HistoryRow> {
    let entry = |index: usize, record: &MoveRecord| HistoryEntry {
        index: index as MoveIndex,
        notation: record.display_notation(),
        current: current == Some(index as MoveIndex),
    };
    moves
        .chunks(2)
        .enumerate()
        .map(|(row, pair)| HistoryRow {
            number: row + 1,
            white: entry(row * 2, &pair[0]),
            black: pair.get(1).map(|record| entry(row * 2 + 1, record)),
        })
        .collect()
}

// One-line game status for the header. `end_reason` comes with the server's status push.
pub fn status_line(game: &Game, my_force: Option<Force>, end_reason: Option<&str>) -> String {
    let by_reason = |text: String| match end_reason {
        Some(reason) => format!("{text} by {reason}"),
        None => text,
    };
    match game.status {
        GameStatus::InProgress => match my_force {
            Some(force) if force == game.current_turn => "Your turn".to_owned(),
            Some(_) => format!("Waiting for {}", game.player(game.current_turn).username),
            None => format!("{} to move", game.current_turn.capitalized_name()),
        },
        GameStatus::WhiteWon | GameStatus::BlackWon => {
            let winner = game.status.winner().unwrap_or(Force::White);
            by_reason(format!("{} wins", winner.capitalized_name()))
        }
        GameStatus::Draw => match end_reason {
            Some(reason) => format!("Draw ({reason})"),
            None => "Draw".to_owned(),
        },
        GameStatus::Abandoned => "Game abandoned".to_owned(),
    }
}

// Name of the other player, from the local user's point of view. Spectators get black's name.
pub fn opponent_name(game: &Game, my_force: Option<Force>) -> &str {
    let opponent = my_force.map_or(Force::Black, Force::opponent);
    &game.player(opponent).username
}

// Pieces captured by `force`, as pictograms.
pub fn captured_summary(captured: &CapturedPieces, force: Force) -> String {
    captured[force].iter().map(|kind| piece_to_pictogram(*kind, force.opponent())).join("")
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{sample_game, sample_game_with_moves, server_moves};

    #[test]
    fn display_coord_corners() {
        let normal = BoardOrientation::Normal;
        let rotated = BoardOrientation::Rotated;
        assert_eq!(to_display_coord(Coord::A8, normal), DisplayCoord { x: 0, y: 0 });
        assert_eq!(to_display_coord(Coord::A1, rotated), DisplayCoord { x: 7, y: 0 });
        assert_eq!(from_display_coord(DisplayCoord { x: 7, y: 7 }, rotated), Some(Coord::A8));
        assert_eq!(from_display_coord(DisplayCoord { x: 8, y: 0 }, normal), None);
    }

    #[test]
    fn history_rows() {
        let moves = server_moves(1, "e2e4 e7e5 g1f3");
        let rows = move_history(&moves, Some(1));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 1);
        assert_eq!(rows[0].white.notation, "e4");
        assert!(!rows[0].white.current);
        assert_eq!(rows[0].black.as_ref().map(|e| e.current), Some(true));
        assert_eq!(rows[1].white.notation, "Nf3");
        assert_eq!(rows[1].white.index, 2);
        assert_eq!(rows[1].black, None);
        assert!(move_history(&[], None).is_empty());
    }

    #[test]
    fn status_lines() {
        let mut game = sample_game_with_moves("e2e4");
        assert_eq!(status_line(&game, Some(Force::Black), None), "Your turn");
        assert_eq!(status_line(&game, Some(Force::White), None), "Waiting for bob");
        assert_eq!(status_line(&game, None, None), "Black to move");
        game.status = GameStatus::WhiteWon;
        assert_eq!(status_line(&game, None, Some("checkmate")), "White wins by checkmate");
        game.status = GameStatus::Draw;
        assert_eq!(status_line(&game, None, Some("stalemate")), "Draw (stalemate)");
        game.status = GameStatus::Abandoned;
        assert_eq!(status_line(&game, None, None), "Game abandoned");
    }

    #[test]
    fn opponent() {
        let game = sample_game();
        assert_eq!(opponent_name(&game, Some(Force::White)), "bob");
        assert_eq!(opponent_name(&game, Some(Force::Black)), "alice");
        assert_eq!(BoardOrientation::for_force(Some(Force::Black)), BoardOrientation::Rotated);
    }
}
