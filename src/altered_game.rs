// Defines `AlteredGame`, the client-side copy of a game that combines the state confirmed by the
// server with optimistic local moves.
//
// The general philosophy is that server is trusted, but the user is not. Local moves are checked
// by the position engine and applied immediately; anything the server says later overrides them.
// Game status is never changed locally: even when a local move ends the game, the client only
// reports it and waits for the server to confirm.
//
// Replay (viewing historical positions) is layered on top and never modifies the game.

use std::cell::{Ref, RefCell};

use instant::Instant;

use crate::chess::ChessPosition;
use crate::coord::{Coord, Row};
use crate::dirty::Dirty;
use crate::error::{EventError, MoveError};
use crate::force::Force;
use crate::game::{Game, GameId, MoveRecord, UserId};
use crate::piece::PieceKind;
use crate::position::{LegalMoveMap, PositionEngine, PositionError, Termination};
use crate::replay::{
    MoveIndex, ReplayDestination, ReplayFrame, ReplayMode, ReplayState, replay_frame_with,
    replay_moves,
};


#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LocalMove {
    pub record: MoveRecord,
    // Set if the move ended the game according to the position engine. Must be reported to the
    // server; the status changes only when the server says so.
    pub termination: Option<Termination>,
}

#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MergeOutcome {
    // A new move (normally the opponent's) was appended.
    Appended,
    // The server confirmed a pending local move.
    Confirmed,
    // The move was already known. Nothing changed.
    Duplicate,
    // The server's move differs from the local one with the same number. The local move and
    // everything after it was discarded in favour of the server's version.
    Replaced,
    // One or more moves are missing between the local list and the incoming move. Nothing was
    // applied; a full game snapshot must be requested.
    ResyncNeeded,
}

#[derive(Clone, Debug)]
pub struct AlteredGame<E: PositionEngine = ChessPosition> {
    // All local actions are assumed to be made on behalf of this user. Constant.
    my_id: UserId,
    // Piece chosen when a local pawn reaches the last rank.
    auto_promotion: PieceKind,
    // The game including optimistic local moves.
    game: Dirty<Game>,
    // Move number of the local move not yet echoed by the server. Since players alternate, there
    // can be at most one.
    pending_local_move: Option<u32>,
    replay: Dirty<ReplayState>,
    // Data determistically computed based on the other fields. Don't use this field directly, even
    // internally! Use `derived_data()` instead, which ensures that the data is up-to-date.
    derived_data: RefCell<DerivedData<E>>,
}

#[derive(Clone, Debug)]
struct DerivedData<E> {
    live_position: E,
    legal_moves: LegalMoveMap,
    replay_frame: Option<ReplayFrame>,
}

impl<E: PositionEngine> AlteredGame<E> {
    pub fn new(my_id: UserId, game: Game, auto_promotion: PieceKind, replay: ReplayState) -> Self {
        let live_position = compute_live_position::<E>(&game);
        let replay_frame = compute_replay_frame::<E>(&game, &replay);
        let derived_data = DerivedData {
            legal_moves: live_position.legal_moves(),
            live_position,
            replay_frame,
        };
        AlteredGame {
            my_id,
            auto_promotion,
            game: Dirty::new(game),
            pending_local_move: None,
            replay: Dirty::new(replay),
            derived_data: RefCell::new(derived_data),
        }
    }

    pub fn my_id(&self) -> UserId { self.my_id }
    pub fn game(&self) -> &Game { &self.game }
    pub fn game_id(&self) -> GameId { self.game.id }
    pub fn is_active(&self) -> bool { self.game.is_active() }
    pub fn num_moves(&self) -> usize { self.game.moves.len() }
    pub fn has_pending_local_move(&self) -> bool { self.pending_local_move.is_some() }

    // The color the local user plays, or `None` for spectators.
    pub fn my_force(&self) -> Option<Force> { self.game.force_of_user(self.my_id) }

    pub fn is_local_turn(&self) -> bool { self.my_force() == Some(self.game.current_turn) }

    pub fn live_position(&self) -> Ref<E> { Ref::map(self.derived_data(), |d| &d.live_position) }

    // Legal moves for whoever is to move in the live position.
    pub fn legal_moves(&self) -> Ref<LegalMoveMap> {
        Ref::map(self.derived_data(), |d| &d.legal_moves)
    }

    // Moves the local user may make right now. Empty unless it's a live game, the user's turn,
    // and a live position is shown.
    pub fn interactive_moves(&self) -> LegalMoveMap {
        if self.is_active() && self.is_local_turn() && !self.replay.is_active() {
            self.legal_moves().clone()
        } else {
            LegalMoveMap::new()
        }
    }

    // Check on the live board. Only reported while the game goes on.
    pub fn in_check(&self) -> bool { self.is_active() && self.live_position().is_check() }

    pub fn apply_local_move(&mut self, from: Coord, to: Coord) -> Result<LocalMove, MoveError> {
        if !self.game.is_active() {
            return Err(MoveError::GameOver);
        }
        let Some(force) = self.my_force() else {
            return Err(MoveError::NotPlayer);
        };
        if self.game.current_turn != force {
            return Err(MoveError::NotYourTurn);
        }
        if self.replay.is_active() {
            return Err(MoveError::ReplayActive);
        }
        let mut position = self.live_position().clone();
        let promotion = position
            .piece_at(from)
            .filter(|piece| piece.kind == PieceKind::Pawn && piece.force == force)
            .filter(|_| to.row == Row::last_for(force))
            .map(|_| self.auto_promotion);
        let applied = position.apply_move(from, to, promotion).map_err(|err| {
            log::debug!("Rejected local move {from}{to}: {err:?}");
            MoveError::Illegal
        })?;
        let move_number = self.game.moves.len() as u32 + 1;
        let record = MoveRecord {
            game_id: self.game.id,
            from,
            to,
            piece: applied.piece,
            promotion,
            fen_after: applied.position,
            san_notation: Some(applied.notation),
            move_number,
            player_color: Some(force),
        };
        let game = self.game.get_mut();
        game.moves.push(record.clone());
        game.current_fen = record.fen_after.clone();
        game.current_turn = force.opponent();
        self.pending_local_move = Some(move_number);
        Ok(LocalMove { record, termination: position.termination() })
    }

    pub fn merge_remote_move(&mut self, record: MoveRecord) -> Result<MergeOutcome, EventError> {
        if record.game_id != self.game.id {
            return Err(EventError::WrongGame { expected: self.game.id, actual: record.game_id });
        }
        if record.move_number == 0 {
            return Err(EventError::CannotApplyEvent("move number must be positive".to_owned()));
        }
        let num_moves = self.game.moves.len();
        let index = record.move_number as usize - 1;
        if index > num_moves {
            log::warn!(
                "Game {}: got move {} while only {} moves are known",
                self.game.id,
                record.move_number,
                num_moves
            );
            return Ok(MergeOutcome::ResyncNeeded);
        }
        if index == num_moves {
            self.pending_local_move = None;
            self.push_remote_move(record);
            return Ok(MergeOutcome::Appended);
        }
        let existing = &self.game.moves[index];
        if same_move(existing, &record) {
            if index + 1 < num_moves {
                // An old move delivered again. The latest state is newer than this message.
                return Ok(MergeOutcome::Duplicate);
            }
            let confirmed = self.pending_local_move == Some(record.move_number);
            if *existing != record {
                // Same move, but the server's version (notation, position string) wins.
                self.game.get_mut().moves.truncate(index);
                self.push_remote_move(record);
                self.clamp_replay();
            }
            if confirmed {
                self.pending_local_move = None;
                Ok(MergeOutcome::Confirmed)
            } else {
                Ok(MergeOutcome::Duplicate)
            }
        } else {
            log::info!(
                "Game {}: move {} differs from the local one ({} vs {}), using server version",
                self.game.id,
                record.move_number,
                existing.display_notation(),
                record.display_notation()
            );
            self.game.get_mut().moves.truncate(index);
            self.pending_local_move = None;
            self.push_remote_move(record);
            self.clamp_replay();
            Ok(MergeOutcome::Replaced)
        }
    }

    // Replaces the game with a full server snapshot.
    pub fn merge_status_update(&mut self, game: Game) -> Result<(), EventError> {
        if game.id != self.game.id {
            return Err(EventError::WrongGame { expected: self.game.id, actual: game.id });
        }
        if game.status != self.game.status {
            log::info!("Game {} status: {:?} -> {:?}", game.id, self.game.status, game.status);
        }
        self.game.set(game);
        self.pending_local_move = None;
        // A snapshot could be shorter than the local list.
        self.clamp_replay();
        Ok(())
    }

    pub fn replay(&self) -> &ReplayState { &self.replay }
    pub fn replay_mode(&self) -> ReplayMode { self.replay.mode() }
    pub fn replay_index(&self) -> MoveIndex { self.replay.index(self.num_moves()) }

    // Historical position being shown, if any.
    pub fn replay_frame(&self) -> Ref<Option<ReplayFrame>> {
        Ref::map(self.derived_data(), |d| &d.replay_frame)
    }

    pub fn replay_to(&mut self, destination: ReplayDestination) -> ReplayMode {
        let num_moves = self.num_moves();
        self.replay.update(|replay| replay.go_to(destination, num_moves))
    }

    pub fn toggle_auto_play(&mut self, now: Instant) -> ReplayMode {
        let num_moves = self.num_moves();
        self.replay.update(|replay| replay.toggle_auto_play(num_moves, now))
    }

    pub fn stop_replay(&mut self) {
        self.replay.update(|replay| replay.stop());
    }

    // Returns whether the shown position changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let num_moves = self.num_moves();
        self.replay.update(|replay| replay.tick(num_moves, now))
    }

    pub fn next_deadline(&self) -> Option<Instant> { self.replay.next_step_at() }

    fn clamp_replay(&mut self) {
        let num_moves = self.num_moves();
        self.replay.update(|replay| replay.clamp(num_moves));
    }

    fn push_remote_move(&mut self, record: MoveRecord) {
        let game = self.game.get_mut();
        game.current_fen = record.fen_after.clone();
        game.current_turn = record.force().opponent();
        game.moves.push(record);
    }

    fn derived_data(&self) -> Ref<DerivedData<E>> {
        let game_changed = self.game.take_dirt();
        let replay_changed = self.replay.take_dirt();
        if game_changed || replay_changed {
            let mut data = self.derived_data.borrow_mut();
            if game_changed {
                data.live_position = compute_live_position::<E>(&self.game);
                data.legal_moves = data.live_position.legal_moves();
            }
            data.replay_frame = compute_replay_frame::<E>(&self.game, &self.replay);
        }
        self.derived_data.borrow()
    }
}

// Moves are the same if they go between the same squares with the same promotion. Notation and
// position strings may legitimately differ between engines.
fn same_move(a: &MoveRecord, b: &MoveRecord) -> bool {
    a.from == b.from && a.to == b.to && a.promotion == b.promotion
}

// Position strings are compared without the move clocks.
fn same_position(a: &str, b: &str) -> bool {
    a.split_whitespace().take(4).eq(b.split_whitespace().take(4))
}

// Replays the move list from the initial position to keep repetition history. If that fails or
// disagrees with the server's current position, the server's position wins.
fn compute_live_position<E: PositionEngine>(game: &Game) -> E {
    let replayed = replay_moves::<E>(&game.moves);
    match &replayed {
        Ok(position) if same_position(&position.position(), &game.current_fen) => {
            return position.clone();
        }
        Ok(_) => log::info!(
            "Game {}: move list does not lead to the current position, loading it directly",
            game.id
        ),
        Err(err) => log::warn!("Game {}: cannot replay moves: {err:?}", game.id),
    }
    match E::from_position(&game.current_fen) {
        Ok(position) => position,
        Err(PositionError::InvalidPosition(message)) if replayed.is_ok() => {
            log::error!("Game {}: invalid current position: {message}", game.id);
            replayed.unwrap_or_default()
        }
        Err(err) => {
            log::error!("Game {}: no usable position: {err:?}", game.id);
            E::default()
        }
    }
}

fn compute_replay_frame<E: PositionEngine>(
    game: &Game, replay: &ReplayState,
) -> Option<ReplayFrame> {
    if !replay.is_active() {
        return None;
    }
    let index = replay.index(game.moves.len());
    match replay_frame_with::<E>(&game.moves, index) {
        Ok(frame) => Some(frame),
        Err(err) => {
            log::error!("Game {}: cannot show move {index}: {err:?}", game.id);
            None
        }
    }
}
