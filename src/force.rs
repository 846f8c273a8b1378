use std::fmt;

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::EnumIter;


#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[derive(Enum, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Force {
    White,
    Black,
}

impl Force {
    pub fn opponent(self) -> Force {
        match self {
            Force::White => Force::Black,
            Force::Black => Force::White,
        }
    }

    // Side to move after `num_moves` half-moves have been played from the initial position.
    pub fn to_move_after(num_moves: usize) -> Force {
        if num_moves % 2 == 0 { Force::White } else { Force::Black }
    }

    // Side that made the half-move with the given 1-based sequence number.
    pub fn of_move_number(move_number: u32) -> Force {
        if move_number % 2 == 1 { Force::White } else { Force::Black }
    }

    pub fn name(self) -> &'static str {
        match self {
            Force::White => "white",
            Force::Black => "black",
        }
    }

    pub fn capitalized_name(self) -> &'static str {
        match self {
            Force::White => "White",
            Force::Black => "Black",
        }
    }
}

impl fmt::Display for Force {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}
