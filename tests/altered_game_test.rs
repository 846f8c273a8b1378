mod common;

use pretty_assertions::assert_eq;

use common::*;
use live_chess::altered_game::MergeOutcome;
use live_chess::chess::{ChessPosition, INITIAL_POSITION};
use live_chess::coord::Coord;
use live_chess::error::MoveError;
use live_chess::force::Force;
use live_chess::game::GameStatus;
use live_chess::material::captured_pieces;
use live_chess::piece::PieceKind;
use live_chess::position::{PositionEngine, Termination};
use live_chess::replay::{ReplayDestination, ReplayMode, replay_frame};
use live_chess::test_util::{
    alice, bob, charlie, sample_game, sample_game_with_moves, server_moves,
};


// Italian game with castling and an exchange on d4.
const ITALIAN: &str = "e2e4 e7e5 g1f3 b8c6 f1c4 f8c5 e1g1 g8f6 d2d4 e5d4";

// Positions after each move of `ITALIAN`, as the server sends them.
const ITALIAN_FENS: [&str; 10] = [
    "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
    "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
    "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
    "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
    "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq - 5 4",
    "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 w kq - 6 5",
    "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2BPP3/5N2/PPP2PPP/RNBQ1RK1 b kq - 0 5",
    "r1bqk2r/pppp1ppp/2n2n2/2b5/2BpP3/5N2/PPP2PPP/RNBQ1RK1 w kq - 0 6",
];

#[test]
fn replay_reproduces_recorded_positions() {
    let moves = server_moves(1, ITALIAN);
    assert_eq!(moves.len(), ITALIAN_FENS.len());
    for (index, (record, &fen)) in moves.iter().zip(ITALIAN_FENS.iter()).enumerate() {
        let frame = replay_frame(&moves, index as isize).unwrap();
        assert_eq!(frame.position, fen, "after move {}", record.move_number);
        assert_eq!(record.fen_after, fen, "after move {}", record.move_number);
    }
    assert_eq!(replay_frame(&moves, -1).unwrap().position, INITIAL_POSITION);
}

#[test]
fn live_position_matches_server_fen() {
    let alt_game = altered_game_for(&alice(), sample_game_with_moves(ITALIAN));
    assert_eq!(alt_game.live_position().position(), ITALIAN_FENS[9]);
    assert!(alt_game.is_local_turn());
}

#[test]
fn illegal_queen_capture_changes_nothing() {
    let mut alt_game = altered_game_for(&alice(), sample_game_with_moves("e2e4 e7e5"));
    let before = alt_game.game().clone();
    // Qxf7 and Qxd7 are both out of the queen's reach.
    for (from, to) in [mv!(D1 -> F7), mv!(D1 -> D7)] {
        assert_eq!(alt_game.apply_local_move(from, to), Err(MoveError::Illegal));
        assert_eq!(alt_game.game(), &before);
        assert_eq!(alt_game.game().moves.len(), 2);
        assert_eq!(alt_game.game().current_turn, Force::White);
        assert!(!alt_game.has_pending_local_move());
        assert!(alt_game.live_position().piece_at(Coord::D1).is(piece!(White Queen)));
    }
    // The rejected attempts leave the real Qh5 available.
    let (from, to) = mv!(D1 -> H5);
    let local = alt_game.apply_local_move(from, to).unwrap();
    assert_eq!(local.record.san_notation.as_deref(), Some("Qh5"));
    assert_eq!(alt_game.game().moves.len(), 3);
}

#[test]
fn local_move_is_applied_optimistically() {
    let mut alt_game = altered_game_for(&alice(), sample_game());
    let (from, to) = mv!(G1 -> F3);
    let local = alt_game.apply_local_move(from, to).unwrap();
    assert_eq!(local.record.move_number, 1);
    assert_eq!(local.record.piece, PieceKind::Knight);
    assert_eq!(local.record.san_notation.as_deref(), Some("Nf3"));
    assert_eq!(local.record.player_color, Some(Force::White));
    assert_eq!(local.termination, None);
    assert!(alt_game.live_position().piece_at(Coord::F3).is(piece!(White Knight)));
    assert_eq!(alt_game.game().current_turn, Force::Black);
    assert!(!alt_game.is_local_turn());
    assert!(alt_game.interactive_moves().is_empty());
}

#[test]
fn remote_move_merge_is_idempotent() {
    let mut alt_game = altered_game_for(&bob(), sample_game());
    let moves = server_moves(alt_game.game_id(), "e2e4");
    assert_eq!(alt_game.merge_remote_move(moves[0].clone()), Ok(MergeOutcome::Appended));
    let after_first = alt_game.game().clone();
    for _ in 0..3 {
        assert_eq!(alt_game.merge_remote_move(moves[0].clone()), Ok(MergeOutcome::Duplicate));
        assert_eq!(alt_game.game(), &after_first);
    }
    assert!(alt_game.is_local_turn());
}

#[test]
fn opponent_move_updates_legal_moves() {
    let mut alt_game = altered_game_for(&bob(), sample_game());
    assert!(alt_game.interactive_moves().is_empty());
    let moves = server_moves(alt_game.game_id(), "e2e4");
    assert_eq!(alt_game.merge_remote_move(moves[0].clone()), Ok(MergeOutcome::Appended));
    let legal = alt_game.interactive_moves();
    assert_eq!(legal.values().map(Vec::len).sum::<usize>(), 20);
    assert!(legal[&Coord::E7].contains(&Coord::E5));
}

#[test]
fn local_checkmate_waits_for_server() {
    let mut alt_game = altered_game_for(&bob(), sample_game_with_moves("f2f3 e7e5 g2g4"));
    let (from, to) = mv!(D8 -> H4);
    let local = alt_game.apply_local_move(from, to).unwrap();
    assert_eq!(local.termination, Some(Termination::Checkmate { winner: Force::Black }));
    assert_eq!(local.record.san_notation.as_deref(), Some("Qh4#"));
    assert_eq!(alt_game.game().status, GameStatus::InProgress);
    assert!(alt_game.in_check());
    assert!(alt_game.legal_moves().is_empty());
}

#[test]
fn move_preconditions() {
    let mut alt_game = altered_game_for(&bob(), sample_game());
    let (from, to) = mv!(E7 -> E5);
    assert_eq!(alt_game.apply_local_move(from, to), Err(MoveError::NotYourTurn));

    let mut alt_game = altered_game_for(&charlie(), sample_game());
    let (from, to) = mv!(E2 -> E4);
    assert_eq!(alt_game.apply_local_move(from, to), Err(MoveError::NotPlayer));

    let mut alt_game = altered_game_for(&alice(), sample_game_with_moves("e2e4 e7e5"));
    alt_game.replay_to(ReplayDestination::First);
    let (from, to) = mv!(G1 -> F3);
    assert_eq!(alt_game.apply_local_move(from, to), Err(MoveError::ReplayActive));
    alt_game.replay_to(ReplayDestination::Last);
    assert!(alt_game.apply_local_move(from, to).is_ok());

    let mut game = sample_game();
    game.status = GameStatus::Abandoned;
    let mut alt_game = altered_game_for(&alice(), game);
    assert_eq!(alt_game.apply_local_move(from, to), Err(MoveError::GameOver));
}

#[test]
fn replay_stays_pinned_while_moves_arrive() {
    let mut alt_game = altered_game_for(&charlie(), sample_game_with_moves("e2e4"));
    assert_eq!(alt_game.replay_to(ReplayDestination::First), ReplayMode::Scrubbing);
    let moves = server_moves(alt_game.game_id(), "e2e4 e7e5");
    assert_eq!(alt_game.merge_remote_move(moves[1].clone()), Ok(MergeOutcome::Appended));

    assert_eq!(alt_game.replay_mode(), ReplayMode::Scrubbing);
    assert_eq!(alt_game.replay_index(), -1);
    let frame = alt_game.replay_frame().clone().unwrap();
    assert_eq!(frame.position, INITIAL_POSITION);
    assert!(frame.board[Coord::E2].is(piece!(White Pawn)));
    assert_eq!(frame.last_move, None);

    // The live position moved on underneath.
    assert_eq!(alt_game.num_moves(), 2);
    assert!(alt_game.live_position().piece_at(Coord::E5).is(piece!(Black Pawn)));

    assert_eq!(alt_game.replay_to(ReplayDestination::Last), ReplayMode::Live);
    assert!(alt_game.replay_frame().is_none());
}

#[test]
fn snapshot_clamps_replay_index() {
    let mut alt_game = altered_game_for(&charlie(), sample_game_with_moves(ITALIAN));
    alt_game.replay_to(ReplayDestination::Index(7));
    alt_game.merge_status_update(sample_game_with_moves("e2e4 e7e5 g1f3")).unwrap();
    assert_eq!(alt_game.replay_mode(), ReplayMode::Live);
    assert_eq!(alt_game.replay_index(), 2);
}

#[test]
fn replaced_move_clamps_replay_index() {
    let mut alt_game =
        altered_game_for(&charlie(), sample_game_with_moves("e2e4 e7e5 g1f3 b8c6 f1c4"));
    assert_eq!(alt_game.replay_to(ReplayDestination::Index(3)), ReplayMode::Scrubbing);
    let server = server_moves(alt_game.game_id(), "e2e4 d7d5");
    assert_eq!(alt_game.merge_remote_move(server[1].clone()), Ok(MergeOutcome::Replaced));
    assert_eq!(alt_game.num_moves(), 2);
    assert_eq!(alt_game.replay_index(), 1);
    assert_eq!(alt_game.replay_mode(), ReplayMode::Live);
    assert!(alt_game.replay_frame().is_none());
}

#[test]
fn replaced_move_keeps_earlier_replay_position() {
    let mut alt_game =
        altered_game_for(&charlie(), sample_game_with_moves("e2e4 e7e5 g1f3 b8c6 f1c4"));
    alt_game.replay_to(ReplayDestination::Index(0));
    let server = server_moves(alt_game.game_id(), "e2e4 d7d5");
    assert_eq!(alt_game.merge_remote_move(server[1].clone()), Ok(MergeOutcome::Replaced));
    assert_eq!(alt_game.replay_mode(), ReplayMode::Scrubbing);
    assert_eq!(alt_game.replay_index(), 0);
    assert_eq!(alt_game.replay_frame().as_ref().map(|frame| frame.index), Some(0));
}

#[test]
fn empty_snapshot_ends_replay() {
    let mut alt_game = altered_game_for(&charlie(), sample_game_with_moves("e2e4 e7e5 g1f3"));
    alt_game.replay_to(ReplayDestination::Index(1));
    alt_game.merge_status_update(sample_game()).unwrap();
    assert_eq!(alt_game.num_moves(), 0);
    assert_eq!(alt_game.replay_mode(), ReplayMode::Live);
    assert_eq!(alt_game.replay_index(), -1);
    assert!(alt_game.replay_frame().is_none());
}

#[test]
fn material_on_parsed_board() {
    let grid = parse_board(
        "
        r n b q k b n r
        p p p p p p p p
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        P P P P P P P P
        R N B Q K B . R
        ",
    )
    .unwrap();
    let captured = captured_pieces(&grid);
    assert_eq!(captured[Force::Black], vec![PieceKind::Knight]);
    assert!(captured[Force::White].is_empty());

    let mut reference = ChessPosition::default().board();
    reference[Coord::G1] = None;
    assert_eq!(grid, reference);
}

#[test]
fn material_after_exchange() {
    let alt_game = altered_game_for(&alice(), sample_game_with_moves("e2e4 d7d5 e4d5 d8d5"));
    let captured = captured_pieces(&alt_game.live_position().board());
    assert_eq!(captured[Force::White], vec![PieceKind::Pawn]);
    assert_eq!(captured[Force::Black], vec![PieceKind::Pawn]);
}
