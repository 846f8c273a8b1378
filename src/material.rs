// Captured material derived from a single board snapshot, so the live game and any replayed
// position are treated the same way.

use enum_map::{EnumMap, enum_map};

use crate::force::Force;
use crate::grid::Grid;
use crate::piece::PieceKind;


// Order in which captured pieces are listed: most valuable first.
pub const CAPTURE_DISPLAY_ORDER: [PieceKind; 5] =
    [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight, PieceKind::Pawn];

pub type CapturedPieces = EnumMap<Force, Vec<PieceKind>>;

// For each side, the opponent pieces it has captured. A side is credited with the shortfall of
// each opponent piece kind relative to the starting material. Extra pieces (promotions) never
// produce negative captures.
pub fn captured_pieces(grid: &Grid) -> CapturedPieces {
    let mut on_board: EnumMap<Force, EnumMap<PieceKind, u8>> = EnumMap::default();
    for (_, piece) in grid.pieces() {
        on_board[piece.force][piece.kind] += 1;
    }
    let mut captured = enum_map! { _ => Vec::new() };
    for (force, counts) in on_board {
        for kind in CAPTURE_DISPLAY_ORDER {
            let missing = kind.starting_count().saturating_sub(counts[kind]);
            captured[force.opponent()].extend(std::iter::repeat_n(kind, missing.into()));
        }
    }
    captured
}

// Material balance in pawns from white's point of view, using the usual 1/3/3/5/9 weights.
pub fn material_advantage(captured: &CapturedPieces) -> i32 {
    let value = |pieces: &Vec<PieceKind>| pieces.iter().map(|kind| piece_value(*kind)).sum::<i32>();
    value(&captured[Force::White]) - value(&captured[Force::Black])
}

fn piece_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 1,
        PieceKind::Knight | PieceKind::Bishop => 3,
        PieceKind::Rook => 5,
        PieceKind::Queen => 9,
        PieceKind::King => 0,
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::ChessPosition;
    use crate::coord::Coord;
    use crate::position::PositionEngine;

    #[test]
    fn initial_position_has_no_captures() {
        let captured = captured_pieces(&ChessPosition::default().board());
        assert!(captured[Force::White].is_empty());
        assert!(captured[Force::Black].is_empty());
        assert_eq!(material_advantage(&captured), 0);
    }

    #[test]
    fn missing_white_knight_is_black_capture() {
        let mut grid = ChessPosition::default().board();
        grid[Coord::G1] = None;
        let captured = captured_pieces(&grid);
        assert_eq!(captured[Force::Black], vec![PieceKind::Knight]);
        assert!(captured[Force::White].is_empty());
    }

    #[test]
    fn listed_most_valuable_first() {
        let position = ChessPosition::from_position("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let captured = captured_pieces(&position.board());
        assert_eq!(captured[Force::White].len(), 15);
        assert_eq!(&captured[Force::White][..4], &[
            PieceKind::Queen,
            PieceKind::Rook,
            PieceKind::Rook,
            PieceKind::Bishop
        ]);
        assert_eq!(captured[Force::White].last(), Some(&PieceKind::Pawn));
    }

    #[test]
    fn promotion_does_not_go_negative() {
        // White has promoted a pawn to a second queen; black is missing a rook.
        let position =
            ChessPosition::from_position("1nbqkbnr/pppppppp/8/8/8/8/1PPPPPPP/RNBQKBNQ w k - 0 1")
                .unwrap();
        let captured = captured_pieces(&position.board());
        assert_eq!(captured[Force::White], vec![PieceKind::Rook]);
        assert_eq!(captured[Force::Black], vec![PieceKind::Rook, PieceKind::Pawn]);
        assert_eq!(material_advantage(&captured), -1);
    }
}
