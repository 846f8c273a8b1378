// Contract of the chess rules engine. The client never validates moves itself: legality, move
// notation and game termination all come from an implementation of `PositionEngine`.
//
// Engine instances are cheap, disposable values. The live game keeps one derived from the
// confirmed move list; replay creates a fresh one for every rendered historical position.

use std::collections::BTreeMap;
use std::fmt;

use crate::coord::Coord;
use crate::force::Force;
use crate::grid::Grid;
use crate::piece::{Piece, PieceKind};


// Origin square -> destination squares legal for the piece standing there.
pub type LegalMoveMap = BTreeMap<Coord, Vec<Coord>>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PositionError {
    InvalidPosition(String),
    IllegalMove,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AppliedMove {
    pub piece: PieceKind,
    pub position: String,
    pub notation: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DrawReason {
    Stalemate,
    Repetition,
    InsufficientMaterial,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Termination {
    Checkmate { winner: Force },
    Draw(DrawReason),
}

impl DrawReason {
    pub fn reason_code(self) -> &'static str {
        match self {
            DrawReason::Stalemate => "stalemate",
            DrawReason::Repetition => "repetition",
            DrawReason::InsufficientMaterial => "insufficient material",
        }
    }
}

impl Termination {
    pub fn reason_code(self) -> &'static str {
        match self {
            Termination::Checkmate { .. } => "checkmate",
            Termination::Draw(reason) => reason.reason_code(),
        }
    }
}

pub trait PositionEngine: Clone + Default + fmt::Debug {
    // Replaces the current position. Repetition history starts over from this position.
    fn load(&mut self, position: &str) -> Result<(), PositionError>;
    fn position(&self) -> String;
    fn side_to_move(&self) -> Force;
    fn piece_at(&self, coord: Coord) -> Option<Piece>;
    fn board(&self) -> Grid;
    fn legal_moves(&self) -> LegalMoveMap;
    // On error the position is left untouched.
    fn apply_move(
        &mut self, from: Coord, to: Coord, promotion: Option<PieceKind>,
    ) -> Result<AppliedMove, PositionError>;
    fn is_check(&self) -> bool;
    fn is_checkmate(&self) -> bool;
    fn is_stalemate(&self) -> bool;
    fn is_threefold_repetition(&self) -> bool;
    fn is_insufficient_material(&self) -> bool;

    fn termination(&self) -> Option<Termination> {
        if self.is_checkmate() {
            Some(Termination::Checkmate { winner: self.side_to_move().opponent() })
        } else if self.is_stalemate() {
            Some(Termination::Draw(DrawReason::Stalemate))
        } else if self.is_threefold_repetition() {
            Some(Termination::Draw(DrawReason::Repetition))
        } else if self.is_insufficient_material() {
            Some(Termination::Draw(DrawReason::InsufficientMaterial))
        } else {
            None
        }
    }

    fn from_position(position: &str) -> Result<Self, PositionError> {
        let mut engine = Self::default();
        engine.load(position)?;
        Ok(engine)
    }
}
