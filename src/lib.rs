#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod altered_game;
pub mod chess;
pub mod client;
pub mod config;
pub mod coord;
pub mod dirty;
pub mod display;
pub mod error;
pub mod event;
pub mod force;
pub mod game;
pub mod grid;
pub mod material;
pub mod piece;
pub mod position;
pub mod readiness;
pub mod replay;
pub mod session;
pub mod subscription;
pub mod test_util;
