// Test utilities shared by unit tests and by the integration tests in "tests".

use itertools::Itertools;

use crate::chess::{ChessPosition, INITIAL_POSITION};
use crate::coord::parse_move_input;
use crate::force::Force;
use crate::game::{Game, GameId, GameStatus, MoveRecord, PlayerInfo};
use crate::position::PositionEngine;
use crate::session::UserInfo;
use crate::subscription::{InboundFrame, SubscriptionId, Transport};


pub const SAMPLE_GAME_ID: GameId = 42;

pub fn alice() -> UserInfo { UserInfo { id: 1, username: "alice".to_owned() } }
pub fn bob() -> UserInfo { UserInfo { id: 2, username: "bob".to_owned() } }
pub fn charlie() -> UserInfo { UserInfo { id: 3, username: "charlie".to_owned() } }

// A fresh game with Alice as white and Bob as black.
pub fn sample_game() -> Game {
    let player = |user: UserInfo| PlayerInfo { id: user.id, username: user.username };
    Game {
        id: SAMPLE_GAME_ID,
        white_player: player(alice()),
        black_player: player(bob()),
        status: GameStatus::InProgress,
        current_turn: Force::White,
        current_fen: INITIAL_POSITION.to_owned(),
        moves: Vec::new(),
        created_at: None,
        updated_at: None,
    }
}

// Records the moves the way the server would confirm them. Panics on illegal moves.
pub fn server_moves(game_id: GameId, moves: &str) -> Vec<MoveRecord> {
    let mut engine = ChessPosition::default();
    moves
        .split_whitespace()
        .enumerate()
        .map(|(index, input)| {
            let (from, to, promotion) = parse_move_input(input).unwrap();
            let force = engine.side_to_move();
            let applied = engine.apply_move(from, to, promotion).unwrap();
            MoveRecord {
                game_id,
                from,
                to,
                piece: applied.piece,
                promotion,
                fen_after: applied.position,
                san_notation: Some(applied.notation),
                move_number: index as u32 + 1,
                player_color: Some(force),
            }
        })
        .collect()
}

// The sample game after the given moves, in the state the server would report it.
pub fn sample_game_with_moves(moves: &str) -> Game {
    let mut game = sample_game();
    game.moves = server_moves(game.id, moves);
    if let Some(last) = game.moves.last() {
        game.current_fen = last.fen_after.clone();
    }
    game.current_turn = Force::to_move_after(game.moves.len());
    game
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SentMessage {
    pub destination: String,
    pub body: String,
}

// In-memory transport that records everything the client does with it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    active: bool,
    next_subscription: SubscriptionId,
    subscriptions: Vec<(SubscriptionId, String)>,
    sent: Vec<SentMessage>,
    num_connects: usize,
}

impl RecordingTransport {
    pub fn new() -> Self { Self::default() }

    pub fn sent(&self) -> &[SentMessage] { &self.sent }
    pub fn take_sent(&mut self) -> Vec<SentMessage> { std::mem::take(&mut self.sent) }
    pub fn num_connects(&self) -> usize { self.num_connects }

    pub fn sent_to(&self, destination: &str) -> Vec<serde_json::Value> {
        self.sent
            .iter()
            .filter(|m| m.destination == destination)
            .map(|m| serde_json::from_str(&m.body).unwrap())
            .collect()
    }

    pub fn active_subscriptions(&self) -> Vec<String> {
        self.subscriptions.iter().map(|(_, topic)| topic.clone()).sorted().collect()
    }

    // A frame as the broker would deliver it on the current subscription to `topic`.
    pub fn frame(&self, topic: &str, body: &str) -> Option<InboundFrame> {
        let (subscription, _) = self.subscriptions.iter().find(|(_, t)| t == topic)?;
        Some(InboundFrame {
            subscription: *subscription,
            topic: topic.to_owned(),
            body: body.to_owned(),
        })
    }

    // Simulates the connection dying without the client asking for it.
    pub fn drop_connection(&mut self) {
        self.active = false;
        self.subscriptions.clear();
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self) {
        self.active = true;
        self.num_connects += 1;
    }
    fn disconnect(&mut self) {
        self.active = false;
        self.subscriptions.clear();
    }
    fn is_active(&self) -> bool { self.active }
    fn subscribe(&mut self, topic: &str) -> SubscriptionId {
        assert!(self.active);
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscriptions.push((id, topic.to_owned()));
        id
    }
    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.retain(|(id, _)| *id != subscription);
    }
    fn send(&mut self, destination: &str, body: String) {
        assert!(self.active);
        self.sent.push(SentMessage { destination: destination.to_owned(), body });
    }
}
