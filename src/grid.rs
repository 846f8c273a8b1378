use std::{fmt, ops};

use crate::coord::{Coord, NUM_COLS, NUM_ROWS};
use crate::piece::Piece;


// Snapshot of piece placement. This is what the position engine reports through `board()` and
// what the material calculator and the console renderer consume.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    data: [[Option<Piece>; NUM_COLS as usize]; NUM_ROWS as usize],
}

impl Grid {
    pub fn new() -> Self { Grid { data: [[None; NUM_COLS as usize]; NUM_ROWS as usize] } }

    pub fn pieces(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        Coord::all().filter_map(|coord| self[coord].map(|piece| (coord, piece)))
    }

    pub fn piece_count(&self) -> usize { self.pieces().count() }
}

impl Default for Grid {
    fn default() -> Self { Self::new() }
}

impl ops::Index<Coord> for Grid {
    type Output = Option<Piece>;
    fn index(&self, pos: Coord) -> &Self::Output {
        &self.data[pos.row.to_zero_based() as usize][pos.col.to_zero_based() as usize]
    }
}

impl ops::IndexMut<Coord> for Grid {
    fn index_mut(&mut self, pos: Coord) -> &mut Self::Output {
        &mut self.data[pos.row.to_zero_based() as usize][pos.col.to_zero_based() as usize]
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Grid ")?;
        f.debug_map()
            .entries(self.pieces().map(|(coord, piece)| (coord.to_algebraic(), piece.to_ascii())))
            .finish()
    }
}
