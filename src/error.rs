use crate::game::GameId;


#[macro_export]
macro_rules! internal_error_message {
    () => {
        format!("Internal error at {}:{}.", file!(), line!())
    };
    ($($arg:tt)+) => {
        format!("Internal error at {}:{}: {}.", file!(), line!(), format!($($arg)*))
    };
}

// Reasons a local move attempt is rejected. None of these is shown to the user: the board simply
// snaps back to the last confirmed position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveError {
    GameOver,
    NotPlayer,
    NotYourTurn,
    ReplayActive,
    BadSquare,
    Illegal,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum EventError {
    CannotParse(String),
    WrongGame { expected: GameId, actual: GameId },
    CannotApplyEvent(String),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FetchError {
    Unavailable(String),
    NotFound(GameId),
    Malformed(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Unavailable(message) => write!(f, "server unavailable: {message}"),
            FetchError::NotFound(game_id) => write!(f, "game {game_id} not found"),
            FetchError::Malformed(message) => write!(f, "malformed game data: {message}"),
        }
    }
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::CannotParse(message) => write!(f, "cannot parse event: {message}"),
            EventError::WrongGame { expected, actual } => {
                write!(f, "event for game {actual} while in game {expected}")
            }
            EventError::CannotApplyEvent(message) => write!(f, "cannot apply event: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}
impl std::error::Error for EventError {}
