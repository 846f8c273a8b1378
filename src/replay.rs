// Replay Controller: read-only navigation through the move list of a game.
//
// The controller only tracks which historical position is shown. Positions are rebuilt from
// the move list with a throwaway engine (`replay_frame`); the game itself is never touched.
//
// Move indices range over [-1, num_moves - 1]; -1 is the initial position. In `Live` mode the
// index is always the last move.

use std::time::Duration;

use instant::Instant;

use crate::chess::ChessPosition;
use crate::force::Force;
use crate::game::MoveRecord;
use crate::grid::Grid;
use crate::material::{CapturedPieces, captured_pieces};
use crate::position::{PositionEngine, PositionError};


pub type MoveIndex = isize;

pub const INITIAL_INDEX: MoveIndex = -1;
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ReplayMode {
    Live,      // showing the current game position
    Scrubbing, // showing a historical position
    Playing,   // showing a historical position and advancing automatically
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReplayDestination {
    Index(MoveIndex),
    Previous,
    Next,
    First,
    Last,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ReplayState {
    mode: ReplayMode,
    // Meaningful only outside of `Live`.
    index: MoveIndex,
    step_interval: Duration,
    next_step_at: Option<Instant>,
}

// Everything needed to render a historical position.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ReplayFrame {
    pub index: MoveIndex,
    pub position: String,
    pub board: Grid,
    pub side_to_move: Force,
    pub last_move: Option<MoveRecord>,
    pub in_check: bool,
    pub captured: CapturedPieces,
}

fn last_index(num_moves: usize) -> MoveIndex { num_moves as MoveIndex - 1 }

impl ReplayState {
    pub fn new(step_interval: Duration) -> Self {
        ReplayState {
            mode: ReplayMode::Live,
            index: INITIAL_INDEX,
            step_interval,
            next_step_at: None,
        }
    }

    pub fn mode(&self) -> ReplayMode { self.mode }
    pub fn is_active(&self) -> bool { self.mode != ReplayMode::Live }
    pub fn is_playing(&self) -> bool { self.mode == ReplayMode::Playing }
    pub fn step_interval(&self) -> Duration { self.step_interval }
    pub fn next_step_at(&self) -> Option<Instant> { self.next_step_at }

    pub fn index(&self, num_moves: usize) -> MoveIndex {
        match self.mode {
            ReplayMode::Live => last_index(num_moves),
            ReplayMode::Scrubbing | ReplayMode::Playing => self.index,
        }
    }

    // Navigates to the given position. Out-of-range requests are clamped. Reaching the last move
    // returns to `Live`. Without moves there is nothing to navigate and the call is ignored.
    pub fn go_to(&mut self, destination: ReplayDestination, num_moves: usize) -> ReplayMode {
        if num_moves == 0 {
            return self.mode;
        }
        let current = self.index(num_moves);
        let last = last_index(num_moves);
        let target = match destination {
            ReplayDestination::Index(index) => index,
            ReplayDestination::Previous => current - 1,
            ReplayDestination::Next => current + 1,
            ReplayDestination::First => INITIAL_INDEX,
            ReplayDestination::Last => last,
        };
        let target = target.clamp(INITIAL_INDEX, last);
        if target == last {
            self.stop();
        } else {
            if self.mode == ReplayMode::Live {
                self.mode = ReplayMode::Scrubbing;
            }
            self.index = target;
        }
        self.mode
    }

    // Keeps a historical index inside [-1, num_moves - 1] after the move list shrinks. Without
    // moves there is no history to show, so replay ends.
    pub fn clamp(&mut self, num_moves: usize) -> ReplayMode {
        if !self.is_active() {
            return self.mode;
        }
        if num_moves == 0 {
            self.stop();
        } else if self.index > last_index(num_moves) {
            self.go_to(ReplayDestination::Index(self.index), num_moves);
        }
        self.mode
    }

    pub fn toggle_auto_play(&mut self, num_moves: usize, now: Instant) -> ReplayMode {
        match self.mode {
            ReplayMode::Playing => self.pause(),
            ReplayMode::Live | ReplayMode::Scrubbing => self.play(num_moves, now),
        }
        self.mode
    }

    // Starts auto-advance. Starts over from the initial position unless a historical position
    // before the last move is already being shown.
    pub fn play(&mut self, num_moves: usize, now: Instant) {
        if num_moves == 0 {
            return;
        }
        if !self.is_active() || self.index >= last_index(num_moves) {
            self.go_to(ReplayDestination::First, num_moves);
        }
        self.mode = ReplayMode::Playing;
        self.next_step_at = Some(now + self.step_interval);
    }

    pub fn pause(&mut self) {
        if self.mode == ReplayMode::Playing {
            self.mode = ReplayMode::Scrubbing;
        }
        self.next_step_at = None;
    }

    // Returns to the live position and cancels auto-advance.
    pub fn stop(&mut self) {
        self.mode = ReplayMode::Live;
        self.next_step_at = None;
    }

    // Advances auto-play if the step deadline has passed. Returns whether the index changed.
    pub fn tick(&mut self, num_moves: usize, now: Instant) -> bool {
        let Some(deadline) = self.next_step_at else {
            return false;
        };
        if now < deadline {
            return false;
        }
        if self.mode != ReplayMode::Playing || self.index >= last_index(num_moves) {
            self.stop();
            return true;
        }
        self.go_to(ReplayDestination::Next, num_moves);
        if self.mode == ReplayMode::Playing {
            // A late tick never triggers a burst of steps.
            let next = deadline + self.step_interval;
            self.next_step_at = Some(if next > now { next } else { now + self.step_interval });
        }
        true
    }
}

impl Default for ReplayState {
    fn default() -> Self { Self::new(DEFAULT_STEP_INTERVAL) }
}

// Rebuilds the position after `moves[0..=index]` with a fresh engine. If the engine rejects a
// recorded move, the position recorded on the target move is used instead.
pub fn replay_frame(moves: &[MoveRecord], index: MoveIndex) -> Result<ReplayFrame, PositionError> {
    replay_frame_with::<ChessPosition>(moves, index)
}

pub fn replay_frame_with<E: PositionEngine>(
    moves: &[MoveRecord], index: MoveIndex,
) -> Result<ReplayFrame, PositionError> {
    let index = index.clamp(INITIAL_INDEX, last_index(moves.len()));
    let prefix = &moves[..(index + 1) as usize];
    let engine = match replay_moves::<E>(prefix) {
        Ok(engine) => engine,
        Err(err) => {
            // Not reachable with an empty prefix: that one always replays.
            let Some(target) = prefix.last() else {
                return Err(err);
            };
            log::warn!(
                "Cannot replay move {}: {:?}; using recorded position",
                target.move_number,
                err
            );
            E::from_position(&target.fen_after)?
        }
    };
    let board = engine.board();
    Ok(ReplayFrame {
        index,
        position: engine.position(),
        captured: captured_pieces(&board),
        board,
        side_to_move: engine.side_to_move(),
        last_move: prefix.last().cloned(),
        in_check: engine.is_check(),
    })
}

pub fn replay_moves<E: PositionEngine>(moves: &[MoveRecord]) -> Result<E, PositionError> {
    let mut engine = E::default();
    for record in moves {
        engine.apply_move(record.from, record.to, record.promotion)?;
    }
    Ok(engine)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::INITIAL_POSITION;
    use crate::coord::Coord;
    use crate::test_util::server_moves;

    fn t0() -> Instant { Instant::now() }

    #[test]
    fn clamps_and_exits_at_end() {
        let mut replay = ReplayState::default();
        assert_eq!(replay.go_to(ReplayDestination::Index(-5), 4), ReplayMode::Scrubbing);
        assert_eq!(replay.index(4), -1);
        assert_eq!(replay.go_to(ReplayDestination::Index(10), 4), ReplayMode::Live);
        assert_eq!(replay.index(4), 3);
        assert_eq!(replay.go_to(ReplayDestination::Index(1), 4), ReplayMode::Scrubbing);
        assert_eq!(replay.index(4), 1);
    }

    #[test]
    fn no_moves_no_replay() {
        let mut replay = ReplayState::default();
        assert_eq!(replay.go_to(ReplayDestination::First, 0), ReplayMode::Live);
        assert_eq!(replay.toggle_auto_play(0, t0()), ReplayMode::Live);
        assert_eq!(replay.next_step_at(), None);
    }

    #[test]
    fn step_navigation() {
        let mut replay = ReplayState::default();
        assert_eq!(replay.go_to(ReplayDestination::Next, 3), ReplayMode::Live);
        assert_eq!(replay.go_to(ReplayDestination::Previous, 3), ReplayMode::Scrubbing);
        assert_eq!(replay.index(3), 1);
        replay.go_to(ReplayDestination::First, 3);
        replay.go_to(ReplayDestination::Previous, 3);
        assert_eq!(replay.index(3), -1);
        replay.go_to(ReplayDestination::Next, 3);
        replay.go_to(ReplayDestination::Next, 3);
        assert_eq!(replay.index(3), 1);
        assert_eq!(replay.go_to(ReplayDestination::Next, 3), ReplayMode::Live);
    }

    #[test]
    fn pinned_while_game_grows() {
        let mut replay = ReplayState::default();
        replay.go_to(ReplayDestination::Index(0), 2);
        assert_eq!(replay.index(3), 0);
        assert_eq!(replay.index(10), 0);
        assert!(replay.is_active());
    }

    #[test]
    fn clamp_after_shrink() {
        let mut replay = ReplayState::default();
        replay.go_to(ReplayDestination::Index(1), 5);
        assert_eq!(replay.clamp(5), ReplayMode::Scrubbing);
        assert_eq!(replay.clamp(3), ReplayMode::Scrubbing);
        assert_eq!(replay.index(3), 1);
        assert_eq!(replay.clamp(2), ReplayMode::Live);
        assert_eq!(replay.index(2), 1);

        replay.go_to(ReplayDestination::First, 4);
        replay.play(4, t0());
        assert_eq!(replay.clamp(0), ReplayMode::Live);
        assert_eq!(replay.index(0), -1);
        assert_eq!(replay.next_step_at(), None);
    }

    #[test]
    fn auto_play_four_moves() {
        let step = DEFAULT_STEP_INTERVAL;
        let t = t0();
        let mut replay = ReplayState::default();
        assert_eq!(replay.toggle_auto_play(4, t), ReplayMode::Playing);
        assert_eq!(replay.index(4), -1);

        assert!(!replay.tick(4, t + step / 2));
        let mut visited = vec![];
        for i in 1..=4 {
            assert!(replay.tick(4, t + step * i));
            visited.push((replay.index(4), replay.mode()));
        }
        assert_eq!(visited, vec![
            (0, ReplayMode::Playing),
            (1, ReplayMode::Playing),
            (2, ReplayMode::Playing),
            (3, ReplayMode::Live),
        ]);
        assert_eq!(replay.next_step_at(), None);
        assert!(!replay.tick(4, t + step * 10));
    }

    #[test]
    fn play_resumes_from_history() {
        let t = t0();
        let mut replay = ReplayState::default();
        replay.go_to(ReplayDestination::Index(1), 4);
        replay.toggle_auto_play(4, t);
        assert_eq!(replay.index(4), 1);
        assert_eq!(replay.toggle_auto_play(4, t), ReplayMode::Scrubbing);
        assert_eq!(replay.next_step_at(), None);
        assert!(!replay.tick(4, t + DEFAULT_STEP_INTERVAL * 5));
        assert_eq!(replay.index(4), 1);
    }

    #[test]
    fn late_tick_steps_once() {
        let t = t0();
        let mut replay = ReplayState::default();
        replay.play(10, t);
        assert!(replay.tick(10, t + DEFAULT_STEP_INTERVAL * 5));
        assert_eq!(replay.index(10), 0);
        assert_eq!(replay.next_step_at(), Some(t + DEFAULT_STEP_INTERVAL * 6));
    }

    #[test]
    fn frame_at_index() {
        let moves = server_moves(1, "e2e4 e7e5 g1f3");
        let start = replay_frame(&moves, -1).unwrap();
        assert_eq!(start.position, INITIAL_POSITION);
        assert_eq!(start.last_move, None);
        assert_eq!(start.side_to_move, Force::White);

        let frame = replay_frame(&moves, 1).unwrap();
        assert_eq!(frame.position, moves[1].fen_after);
        assert_eq!(frame.last_move.as_ref().map(|m| m.to), Some(Coord::E5));
        assert_eq!(frame.side_to_move, Force::White);

        let clamped = replay_frame(&moves, 99).unwrap();
        assert_eq!(clamped.index, 2);
        assert_eq!(clamped.side_to_move, Force::Black);
    }

    #[test]
    fn frame_falls_back_to_recorded_position() {
        let mut moves = server_moves(1, "e2e4 e7e5");
        moves[1].from = Coord::A1;
        let frame = replay_frame(&moves, 1).unwrap();
        assert_eq!(frame.position, moves[1].fen_after);
    }
}
