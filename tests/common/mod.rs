// Rust-upgrade (https://github.com/rust-lang/rust/issues/46379):
//   remove `#[allow(dead_code)]` before public functions.

use itertools::Itertools;

use live_chess::altered_game::AlteredGame;
use live_chess::coord::{Col, Coord, Row};
use live_chess::force::Force;
use live_chess::game::Game;
use live_chess::grid::Grid;
use live_chess::piece::{Piece, PieceKind};
use live_chess::replay::ReplayState;
use live_chess::session::UserInfo;


#[derive(Clone, Copy, Debug)]
pub struct PieceMatcher {
    pub kind: PieceKind,
    pub force: Force,
}

pub trait PieceIs {
    fn is(self, matcher: PieceMatcher) -> bool;
}

impl PieceIs for Option<Piece> {
    fn is(self, matcher: PieceMatcher) -> bool {
        if let Some(piece) = self {
            piece.kind == matcher.kind && piece.force == matcher.force
        } else {
            false
        }
    }
}

#[macro_export]
macro_rules! piece {
    ($force:ident $kind:ident) => {
        common::PieceMatcher {
            force: live_chess::force::Force::$force,
            kind: live_chess::piece::PieceKind::$kind,
        }
    };
}

#[macro_export]
macro_rules! mv {
    ($from:ident -> $to:ident) => {
        (live_chess::coord::Coord::$from, live_chess::coord::Coord::$to)
    };
}

#[allow(dead_code)]
pub fn altered_game_for(user: &UserInfo, game: Game) -> AlteredGame {
    AlteredGame::new(user.id, game, PieceKind::Queen, ReplayState::default())
}

// Parses a board drawn with ASCII pieces, rank 8 first. Dots are empty squares.
#[allow(dead_code)]
pub fn parse_board(board_str: &str) -> Result<Grid, String> {
    let rows = board_str
        .split('\n')
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.split_ascii_whitespace().collect_vec())
        .collect_vec();
    if rows.len() != 8 || rows.iter().any(|row| row.len() != 8) {
        return Err(format!("Expected 8x8 board, got {} rows", rows.len()));
    }
    let mut grid = Grid::new();
    for (row_idx, row) in rows.iter().rev().enumerate() {
        for (col_idx, piece_str) in row.iter().enumerate() {
            let row = Row::from_zero_based(row_idx as u8);
            let coord = Coord::new(row, Col::from_zero_based(col_idx as u8));
            let piece_char = piece_str.chars().exactly_one().map_err(|_| piece_str.to_string())?;
            grid[coord] = match piece_char {
                '.' => None,
                ch => Some(Piece::from_ascii(ch).ok_or_else(|| format!("Invalid piece: {ch}"))?),
            };
        }
    }
    Ok(grid)
}
