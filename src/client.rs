// Client session for one game: composes the Move Synchronizer, replay, channel subscriptions and
// the wait for the transport. Owns the transport; the host feeds it transport events, user
// commands and periodic ticks.

use instant::Instant;

use crate::altered_game::{AlteredGame, MergeOutcome};
use crate::config::ClientConfig;
use crate::coord::{Coord, parse_move_input};
use crate::display::{
    BoardOrientation, BoardView, HistoryRow, board_view, move_history, opponent_name, status_line,
};
use crate::error::{EventError, FetchError, MoveError};
use crate::event::{ClientEvent, ServerChannel, ServerEvent};
use crate::force::Force;
use crate::game::{Game, GameId, GameResult, GameStatus};
use crate::readiness::{ConnectionWait, WaitOutcome};
use crate::replay::{MoveIndex, ReplayDestination, ReplayMode, ReplayState};
use crate::session::UserInfo;
use crate::subscription::{SubscriptionManager, Transport, TransportEvent};


pub const RESIGNATION_REASON: &str = "resignation";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NotableEvent {
    None,
    GameLoaded,
    Connected,
    Disconnected,
    OpponentMoveMade,
    // Own move made elsewhere (e.g. another window of the same user).
    OwnRemoteMoveMade,
    MoveConfirmed,
    LocalMoveOverridden,
    GameUpdated,
    GameOver(GameStatus),
    ResyncRequested,
    ReplayAdvanced,
    ConnectionTimedOut,
}

#[derive(Debug)]
pub enum SessionState {
    // Waiting for the initial game fetch.
    Loading { game_id: GameId },
    Ready {
        // Game state including unconfirmed local changes.
        alt_game: AlteredGame,
        // Reason from the latest status push, e.g. "checkmate".
        end_reason: Option<String>,
    },
    // The session is over: either the user left or the game could not be loaded.
    Left,
}

// Everything a renderer needs for one frame.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ClientView {
    Loading,
    Game(Box<GameView>),
    Left,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameView {
    pub board: BoardView,
    pub history: Vec<HistoryRow>,
    pub status: String,
    pub my_force: Option<Force>,
    pub opponent: String,
    pub is_local_turn: bool,
}

#[derive(Debug)]
pub struct ClientState<T: Transport> {
    user: UserInfo,
    config: ClientConfig,
    manager: SubscriptionManager<T, ServerChannel>,
    connection_wait: ConnectionWait,
    state: SessionState,
}

impl<T: Transport> ClientState<T> {
    pub fn new(transport: T, user: UserInfo, config: ClientConfig, game_id: GameId) -> Self {
        let connection_wait = ConnectionWait::new(config.connection_wait_timeout);
        ClientState {
            user,
            config,
            manager: SubscriptionManager::new(transport),
            connection_wait,
            state: SessionState::Loading { game_id },
        }
    }

    pub fn user(&self) -> &UserInfo { &self.user }
    pub fn config(&self) -> &ClientConfig { &self.config }
    pub fn state(&self) -> &SessionState { &self.state }
    pub fn transport(&self) -> &T { self.manager.transport() }
    pub fn transport_mut(&mut self) -> &mut T { self.manager.transport_mut() }
    pub fn is_connected(&self) -> bool { self.manager.is_active() }
    pub fn subscribed_topics(&self) -> Vec<String> {
        self.manager.topics().map(str::to_owned).collect()
    }

    pub fn game_id(&self) -> Option<GameId> {
        match &self.state {
            SessionState::Loading { game_id } => Some(*game_id),
            SessionState::Ready { alt_game, .. } => Some(alt_game.game_id()),
            SessionState::Left => None,
        }
    }

    pub fn alt_game(&self) -> Option<&AlteredGame> {
        match &self.state {
            SessionState::Ready { alt_game, .. } => Some(alt_game),
            _ => None,
        }
    }

    fn alt_game_mut(&mut self) -> Option<&mut AlteredGame> {
        match &mut self.state {
            SessionState::Ready { alt_game, .. } => Some(alt_game),
            _ => None,
        }
    }

    pub fn my_force(&self) -> Option<Force> { self.alt_game().and_then(AlteredGame::my_force) }
    pub fn is_local_turn(&self) -> bool { self.alt_game().is_some_and(AlteredGame::is_local_turn) }

    // Opens the connection. Readiness is reported later with `TransportEvent::Connected`.
    pub fn connect(&mut self) { self.manager.connect(); }

    // Reopens a lost connection. The game is resubscribed on `Connected`; if that doesn't arrive
    // within the connection timeout, `tick` reports `ConnectionTimedOut`.
    pub fn reconnect(&mut self, now: Instant) {
        if self.manager.is_active() {
            return;
        }
        log::info!("Reconnecting");
        self.manager.connect();
        if matches!(self.state, SessionState::Ready { .. }) {
            self.connection_wait.start(now);
        }
    }

    // Says goodbye and closes the connection. All subscriptions are released.
    pub fn disconnect(&mut self) {
        if self.manager.is_active() {
            let username = self.user.username.clone();
            self.send(ClientEvent::PresenceDisconnect { username });
        }
        self.connection_wait.cancel();
        self.manager.disconnect();
    }

    // Result of the initial game fetch. A failure ends the session.
    pub fn game_fetched(
        &mut self, result: Result<Game, FetchError>, now: Instant,
    ) -> Result<NotableEvent, FetchError> {
        let SessionState::Loading { game_id } = self.state else {
            log::debug!("Ignoring game fetch result: not loading");
            return Ok(NotableEvent::None);
        };
        let result = result.and_then(|game| {
            if game.id == game_id {
                Ok(game)
            } else {
                Err(FetchError::Malformed(format!("got game {} instead of {game_id}", game.id)))
            }
        });
        let game = match result {
            Ok(game) => game,
            Err(err) => {
                log::error!("Cannot load game {game_id}: {err}");
                self.state = SessionState::Left;
                return Err(err);
            }
        };
        log::info!("Loaded game {game_id} with {} moves", game.moves.len());
        let replay = ReplayState::new(self.config.replay_step_interval);
        let alt_game = AlteredGame::new(self.user.id, game, self.config.auto_promotion, replay);
        self.state = SessionState::Ready { alt_game, end_reason: None };
        if self.manager.is_active() {
            self.subscribe_game();
        } else {
            self.connection_wait.start(now);
        }
        Ok(NotableEvent::GameLoaded)
    }

    pub fn process_transport_event(
        &mut self, event: TransportEvent,
    ) -> Result<NotableEvent, EventError> {
        match event {
            TransportEvent::Connected => {
                log::info!("Connected");
                let username = self.user.username.clone();
                self.send(ClientEvent::PresenceConnect { username });
                self.connection_wait.cancel();
                // Subscriptions never survive a reconnect.
                self.subscribe_game();
                Ok(NotableEvent::Connected)
            }
            TransportEvent::Disconnected => {
                self.manager.connection_lost();
                Ok(NotableEvent::Disconnected)
            }
            TransportEvent::Frame(frame) => {
                let Some(channel) = self.manager.handler_for(&frame).copied() else {
                    return Ok(NotableEvent::None);
                };
                let event = channel.decode(&frame.body)?;
                self.process_server_event(event)
            }
        }
    }

    pub fn process_server_event(&mut self, event: ServerEvent) -> Result<NotableEvent, EventError> {
        let SessionState::Ready { alt_game, end_reason } = &mut self.state else {
            log::debug!("Ignoring {event:?}: no game loaded");
            return Ok(NotableEvent::None);
        };
        match event {
            ServerEvent::MoveMade(record) => {
                let by_me = alt_game.my_force() == Some(record.force());
                match alt_game.merge_remote_move(record)? {
                    MergeOutcome::Appended if by_me => Ok(NotableEvent::OwnRemoteMoveMade),
                    MergeOutcome::Appended => Ok(NotableEvent::OpponentMoveMade),
                    MergeOutcome::Confirmed => Ok(NotableEvent::MoveConfirmed),
                    MergeOutcome::Duplicate => Ok(NotableEvent::None),
                    MergeOutcome::Replaced => Ok(NotableEvent::LocalMoveOverridden),
                    MergeOutcome::ResyncNeeded => {
                        let join = ClientEvent::Join {
                            game_id: alt_game.game_id(),
                            username: self.user.username.clone(),
                        };
                        self.send(join);
                        Ok(NotableEvent::ResyncRequested)
                    }
                }
            }
            ServerEvent::StatusChanged { game, reason } => {
                let was_active = alt_game.is_active();
                alt_game.merge_status_update(game)?;
                *end_reason = reason;
                Ok(snapshot_event(alt_game, was_active))
            }
            ServerEvent::GameState(game) => {
                let was_active = alt_game.is_active();
                alt_game.merge_status_update(game)?;
                Ok(snapshot_event(alt_game, was_active))
            }
        }
    }

    // Applies the move locally and sends it. If the move ends the game, the end is reported too;
    // the status itself changes only when the server says so.
    pub fn make_move(&mut self, from: Coord, to: Coord) -> Result<(), MoveError> {
        // No game, no turn.
        let alt_game = self.alt_game_mut().ok_or(MoveError::GameOver)?;
        let game_id = alt_game.game_id();
        let local_move = alt_game.apply_local_move(from, to)?;
        self.send(ClientEvent::MakeMove(local_move.record));
        if let Some(termination) = local_move.termination {
            log::info!("Game {game_id} ended on the board: {}", termination.reason_code());
            self.send(ClientEvent::EndGame {
                game_id,
                result: GameResult::from_termination(termination),
                reason: termination.reason_code().to_owned(),
            });
        }
        Ok(())
    }

    // Text form, e.g. "e2e4". A promotion suffix is accepted but the piece always comes from
    // `auto_promotion`.
    pub fn make_move_input(&mut self, input: &str) -> Result<(), MoveError> {
        let (from, to, _) = parse_move_input(input).ok_or(MoveError::BadSquare)?;
        self.make_move(from, to)
    }

    pub fn resign(&mut self) -> Result<(), MoveError> {
        let alt_game = self.alt_game().ok_or(MoveError::GameOver)?;
        if !alt_game.is_active() {
            return Err(MoveError::GameOver);
        }
        let force = alt_game.my_force().ok_or(MoveError::NotPlayer)?;
        let game_id = alt_game.game_id();
        self.send(ClientEvent::EndGame {
            game_id,
            result: GameResult::victory(force.opponent()),
            reason: RESIGNATION_REASON.to_owned(),
        });
        Ok(())
    }

    pub fn replay_to(&mut self, destination: ReplayDestination) -> ReplayMode {
        match self.alt_game_mut() {
            Some(alt_game) => alt_game.replay_to(destination),
            None => ReplayMode::Live,
        }
    }
    pub fn go_to_move(&mut self, index: MoveIndex) -> ReplayMode {
        self.replay_to(ReplayDestination::Index(index))
    }
    pub fn go_to_start(&mut self) -> ReplayMode { self.replay_to(ReplayDestination::First) }
    pub fn go_to_end(&mut self) -> ReplayMode { self.replay_to(ReplayDestination::Last) }
    pub fn previous_move(&mut self) -> ReplayMode { self.replay_to(ReplayDestination::Previous) }
    pub fn next_move(&mut self) -> ReplayMode { self.replay_to(ReplayDestination::Next) }

    pub fn toggle_auto_play(&mut self, now: Instant) -> ReplayMode {
        match self.alt_game_mut() {
            Some(alt_game) => alt_game.toggle_auto_play(now),
            None => ReplayMode::Live,
        }
    }

    pub fn tick(&mut self, now: Instant) -> NotableEvent {
        let mut notable = NotableEvent::None;
        match self.connection_wait.poll(self.manager.is_active(), now) {
            WaitOutcome::Idle | WaitOutcome::Pending => {}
            WaitOutcome::Ready => self.subscribe_game(),
            WaitOutcome::TimedOut => notable = NotableEvent::ConnectionTimedOut,
        }
        if let Some(alt_game) = self.alt_game_mut() {
            if alt_game.tick(now) && notable == NotableEvent::None {
                notable = NotableEvent::ReplayAdvanced;
            }
        }
        notable
    }

    // When the host should call `tick` next, if there is anything to wait for.
    pub fn next_deadline(&self) -> Option<Instant> {
        let replay = self.alt_game().and_then(AlteredGame::next_deadline);
        [self.connection_wait.deadline(), replay].into_iter().flatten().min()
    }

    // Tears the game view down. The connection stays open for whatever comes next.
    pub fn leave(&mut self) {
        if let Some(game_id) = self.game_id() {
            for channel in ServerChannel::all() {
                self.manager.unsubscribe(&channel.topic(game_id));
            }
        }
        if let Some(alt_game) = self.alt_game_mut() {
            alt_game.stop_replay();
        }
        self.connection_wait.cancel();
        self.state = SessionState::Left;
    }

    pub fn view(&self) -> ClientView {
        match &self.state {
            SessionState::Loading { .. } => ClientView::Loading,
            SessionState::Left => ClientView::Left,
            SessionState::Ready { alt_game, end_reason } => {
                ClientView::Game(Box::new(game_view(alt_game, end_reason.as_deref())))
            }
        }
    }

    fn subscribe_game(&mut self) {
        let Some(game_id) = self.alt_game().map(AlteredGame::game_id) else {
            return;
        };
        let mut all_subscribed = true;
        for channel in ServerChannel::all() {
            all_subscribed &= self.manager.subscribe(&channel.topic(game_id), channel);
        }
        if all_subscribed {
            let username = self.user.username.clone();
            self.send(ClientEvent::Join { game_id, username });
        }
    }

    fn send(&mut self, event: ClientEvent) {
        let destination = event.destination();
        match event.body() {
            Ok(body) => {
                self.manager.send_raw(&destination, body);
            }
            Err(err) => log::error!("Cannot serialize message to {destination}: {err}"),
        }
    }
}

pub fn game_view(alt_game: &AlteredGame, end_reason: Option<&str>) -> GameView {
    let game = alt_game.game();
    let my_force = alt_game.my_force();
    let current = alt_game.replay().is_active().then(|| alt_game.replay_index());
    GameView {
        board: board_view(alt_game, BoardOrientation::for_force(my_force)),
        history: move_history(&game.moves, current),
        status: status_line(game, my_force, end_reason),
        my_force,
        opponent: opponent_name(game, my_force).to_owned(),
        is_local_turn: alt_game.is_local_turn(),
    }
}

fn snapshot_event(alt_game: &AlteredGame, was_active: bool) -> NotableEvent {
    let status = alt_game.game().status;
    if was_active && status.is_terminal() {
        NotableEvent::GameOver(status)
    } else {
        NotableEvent::GameUpdated
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::{GAME_STATE_QUEUE, PRESENCE_CONNECT_DESTINATION, moves_topic, status_topic};
    use crate::test_util::{
        RecordingTransport, SAMPLE_GAME_ID, alice, sample_game, sample_game_with_moves,
    };

    fn loaded_client(now: Instant) -> ClientState<RecordingTransport> {
        let mut client =
            ClientState::new(RecordingTransport::new(), alice(), ClientConfig::default(), 42);
        client.connect();
        client.process_transport_event(TransportEvent::Connected).unwrap();
        client.game_fetched(Ok(sample_game()), now).unwrap();
        client
    }

    #[test]
    fn subscribes_and_joins_after_load() {
        let t = Instant::now();
        let client = loaded_client(t);
        assert_eq!(client.subscribed_topics(), vec![
            moves_topic(SAMPLE_GAME_ID),
            status_topic(SAMPLE_GAME_ID),
            GAME_STATE_QUEUE.to_owned(),
        ]);
        let sent = client.transport().sent();
        assert_eq!(sent[0].destination, PRESENCE_CONNECT_DESTINATION);
        assert_eq!(sent.last().unwrap().destination, "/app/game/42/join");
    }

    #[test]
    fn fetch_failure_leaves() {
        let t = Instant::now();
        let mut client =
            ClientState::new(RecordingTransport::new(), alice(), ClientConfig::default(), 42);
        assert_eq!(client.view(), ClientView::Loading);
        let result = client.game_fetched(Err(FetchError::NotFound(42)), t);
        assert_eq!(result, Err(FetchError::NotFound(42)));
        assert_eq!(client.view(), ClientView::Left);
    }

    #[test]
    fn resign_reports_opponent_victory() {
        let t = Instant::now();
        let mut client = loaded_client(t);
        client.transport_mut().take_sent();
        client.resign().unwrap();
        let sent = client.transport().sent_to("/app/game/42/end");
        assert_eq!(sent, vec![serde_json::json!({"result": "black", "reason": "resignation"})]);
        // Status only changes on the server push.
        assert!(client.alt_game().unwrap().is_active());
    }

    #[test]
    fn status_push_ends_game() {
        let t = Instant::now();
        let mut client = loaded_client(t);
        let mut game = sample_game_with_moves("f2f3 e7e5 g2g4 d8h4");
        game.status = GameStatus::BlackWon;
        let event = ServerEvent::StatusChanged { game, reason: Some("checkmate".to_owned()) };
        assert_eq!(
            client.process_server_event(event),
            Ok(NotableEvent::GameOver(GameStatus::BlackWon))
        );
        let ClientView::Game(view) = client.view() else {
            panic!("expected a game view");
        };
        assert_eq!(view.status, "Black wins by checkmate");
        assert_eq!(client.resign(), Err(MoveError::GameOver));
    }

    #[test]
    fn leave_unsubscribes() {
        let t = Instant::now();
        let mut client = loaded_client(t);
        client.leave();
        assert!(client.subscribed_topics().is_empty());
        assert!(client.transport().active_subscriptions().is_empty());
        assert!(client.is_connected());
        assert_eq!(client.make_move_input("e2e4"), Err(MoveError::GameOver));
    }
}
