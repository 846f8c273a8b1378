// `PositionEngine` backed by `shakmaty`.

use itertools::Itertools;
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Rank, Role, Square};

use crate::coord::{Col, Coord, Row};
use crate::force::Force;
use crate::grid::Grid;
use crate::piece::{Piece, PieceKind};
use crate::position::{AppliedMove, LegalMoveMap, PositionEngine, PositionError};


pub const INITIAL_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Debug)]
pub struct ChessPosition {
    position: Chess,
    // One entry per position reached since the last `load`, used for threefold repetition.
    repetition_keys: Vec<String>,
}

impl Default for ChessPosition {
    fn default() -> Self {
        let position = Chess::default();
        let repetition_keys = vec![repetition_key(&position)];
        ChessPosition { position, repetition_keys }
    }
}

impl PositionEngine for ChessPosition {
    fn load(&mut self, position: &str) -> Result<(), PositionError> {
        let fen: Fen = position.parse().map_err(|err: shakmaty::fen::ParseFenError| {
            PositionError::InvalidPosition(err.to_string())
        })?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|err| PositionError::InvalidPosition(err.to_string()))?;
        self.repetition_keys = vec![repetition_key(&position)];
        self.position = position;
        Ok(())
    }

    fn position(&self) -> String { fen_string(&self.position) }

    fn side_to_move(&self) -> Force { force_from_color(self.position.turn()) }

    fn piece_at(&self, coord: Coord) -> Option<Piece> {
        self.position.board().piece_at(to_square(coord)).map(piece_from_shakmaty)
    }

    fn board(&self) -> Grid {
        let mut grid = Grid::new();
        for coord in Coord::all() {
            grid[coord] = self.piece_at(coord);
        }
        grid
    }

    fn legal_moves(&self) -> LegalMoveMap {
        let mut map = LegalMoveMap::new();
        for m in self.position.legal_moves() {
            let Some(from) = m.from() else {
                continue;
            };
            map.entry(from_square(from)).or_default().push(from_square(destination(&m)));
        }
        // Promotions to different pieces share the destination square.
        for destinations in map.values_mut() {
            destinations.sort();
            destinations.dedup();
        }
        map
    }

    fn apply_move(
        &mut self, from: Coord, to: Coord, promotion: Option<PieceKind>,
    ) -> Result<AppliedMove, PositionError> {
        let from = to_square(from);
        let to = to_square(to);
        let promotion = promotion.map(role_from_kind);
        let m = self
            .position
            .legal_moves()
            .into_iter()
            .find(|m| m.from() == Some(from) && destination(m) == to && m.promotion() == promotion)
            .ok_or(PositionError::IllegalMove)?;
        let mut notation = San::from_move(&self.position, &m).to_string();
        self.position.play_unchecked(&m);
        if self.position.is_checkmate() {
            notation.push('#');
        } else if self.position.is_check() {
            notation.push('+');
        }
        self.repetition_keys.push(repetition_key(&self.position));
        Ok(AppliedMove {
            piece: kind_from_role(m.role()),
            position: self.position(),
            notation,
        })
    }

    fn is_check(&self) -> bool { self.position.is_check() }
    fn is_checkmate(&self) -> bool { self.position.is_checkmate() }
    fn is_stalemate(&self) -> bool { self.position.is_stalemate() }
    fn is_insufficient_material(&self) -> bool { self.position.is_insufficient_material() }

    fn is_threefold_repetition(&self) -> bool {
        let Some(current) = self.repetition_keys.last() else {
            return false;
        };
        self.repetition_keys.iter().filter(|key| *key == current).count() >= 3
    }
}

fn fen_string(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}

// Placement, side to move, castling rights and en passant square: everything but the clocks.
fn repetition_key(position: &Chess) -> String {
    fen_string(position).split_whitespace().take(4).join(" ")
}

// Castling is reported by shakmaty as "king takes rook"; the board widget and the wire protocol
// use the square the king lands on.
fn destination(m: &Move) -> Square {
    match *m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Square::from_coords(file, king.rank())
        }
        _ => m.to(),
    }
}

fn to_square(coord: Coord) -> Square {
    Square::from_coords(
        File::new(u32::from(coord.col.to_zero_based())),
        Rank::new(u32::from(coord.row.to_zero_based())),
    )
}

fn from_square(square: Square) -> Coord {
    Coord::new(
        Row::from_algebraic(square.rank().char()),
        Col::from_algebraic(square.file().char()),
    )
}

fn force_from_color(color: Color) -> Force {
    match color {
        Color::White => Force::White,
        Color::Black => Force::Black,
    }
}

fn kind_from_role(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn role_from_kind(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

fn piece_from_shakmaty(piece: shakmaty::Piece) -> Piece {
    Piece::new(kind_from_role(piece.role), force_from_color(piece.color))
}
