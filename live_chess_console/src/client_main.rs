use std::fmt;
use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self as term_event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{self, Stylize};
use crossterm::{cursor, execute, terminal};
use instant::Instant;
use scopeguard::defer;

use live_chess::client::{ClientState, ClientView, NotableEvent};
use live_chess::config::ClientConfig;
use live_chess::error::{FetchError, MoveError};
use live_chess::game::{Game, GameId};
use live_chess::internal_error_message;
use live_chess::replay::MoveIndex;
use live_chess::subscription::TransportEvent;

use crate::rest;
use crate::stomp::StompTransport;
use crate::tui;


const TICK_INTERVAL: Duration = Duration::from_millis(100);
const RECONNECT_MIN_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

pub struct ClientCommandConfig {
    pub client_config: ClientConfig,
    pub game_id: GameId,
    pub username: String,
    pub password: String,
}

enum IncomingEvent {
    Network(TransportEvent),
    GameFetched(Result<Game, FetchError>),
    Terminal(term_event::Event),
    Tick,
}

impl From<TransportEvent> for IncomingEvent {
    fn from(event: TransportEvent) -> Self { IncomingEvent::Network(event) }
}

type ConsoleClient = ClientState<StompTransport<IncomingEvent>>;

// What to do with the command line after a command.
enum InputOutcome {
    Clear,
    Keep,
    Error(String),
    Quit,
}

// Exponential backoff between attempts to bring a lost connection back.
struct ReconnectSchedule {
    delay: Duration,
    next_attempt: Option<Instant>,
}

impl ReconnectSchedule {
    fn new() -> Self { ReconnectSchedule { delay: RECONNECT_MIN_DELAY, next_attempt: None } }

    fn connection_lost(&mut self, now: Instant) {
        if self.next_attempt.is_none() {
            self.next_attempt = Some(now + self.delay);
        }
    }

    fn connected(&mut self) {
        self.delay = RECONNECT_MIN_DELAY;
        self.next_attempt = None;
    }

    // Returns whether to attempt now. Every attempt doubles the delay before the next one; the
    // schedule keeps going until `connected` is called.
    fn poll(&mut self, now: Instant) -> bool {
        match self.next_attempt {
            Some(at) if now >= at => {
                self.delay = (self.delay * 2).min(RECONNECT_MAX_DELAY);
                self.next_attempt = Some(now + self.delay);
                true
            }
            _ => false,
        }
    }
}

fn writeln_raw(stdout: &mut io::Stdout, v: impl fmt::Display) -> io::Result<()> {
    let s = v.to_string();
    // Note. Not using `lines()` because it removes trailing new line.
    for line in s.split('\n') {
        execute!(stdout, style::Print(line), cursor::MoveToNextLine(1), cursor::Hide)?;
    }
    Ok(())
}

fn render(
    stdout: &mut io::Stdout, app_start_time: Instant, client_state: &ConsoleClient,
    keyboard_input: &str, command_error: &Option<String>,
) -> io::Result<()> {
    let now = Instant::now();
    execute!(stdout, cursor::MoveTo(0, 0))?;
    let mut highlight_input = false;
    match client_state.view() {
        ClientView::Loading => {
            execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
            writeln_raw(stdout, "Loading...")?;
        }
        ClientView::Left => {
            execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
            writeln_raw(stdout, "Left the game.")?;
        }
        ClientView::Game(view) => {
            writeln_raw(stdout, tui::render_game(&view))?;
            // Note. Don't clear the board to avoid blinking.
            execute!(stdout, terminal::Clear(terminal::ClearType::FromCursorDown))?;
            highlight_input = view.is_local_turn;
        }
    }
    if !client_state.is_connected() {
        writeln_raw(stdout, "Not connected".with(style::Color::DarkYellow))?;
    }

    // Simulate cursor: real cursor blinking is broken with Show/Hide.
    let show_cursor = now.duration_since(app_start_time).as_millis() % 1000 >= 500;
    let cursor = if show_cursor { '▂' } else { ' ' };
    let input_with_cursor = format!("{keyboard_input}{cursor}");
    let input_style = if highlight_input { style::Color::White } else { style::Color::DarkGrey };
    writeln_raw(stdout, format!("{}\n", input_with_cursor.with(input_style)))?;

    if let Some(err) = command_error {
        writeln_raw(stdout, err.clone().with(style::Color::Red))?;
    }
    Ok(())
}

fn execute_command(client_state: &mut ConsoleClient, input: &str, now: Instant) -> InputOutcome {
    let Some(cmd) = input.strip_prefix('/') else {
        return match client_state.make_move_input(input) {
            // Illegal moves are not reported: the board simply stays as it was.
            Ok(()) | Err(MoveError::Illegal) => InputOutcome::Clear,
            Err(MoveError::NotYourTurn) => InputOutcome::Keep,
            Err(MoveError::BadSquare) => InputOutcome::Error(format!("Cannot parse '{input}'")),
            Err(MoveError::ReplayActive) => {
                InputOutcome::Error("Return to the live position first (/end)".to_owned())
            }
            Err(err) => InputOutcome::Error(format!("Cannot move: {err:?}")),
        };
    };
    let mut words = cmd.split_whitespace();
    match (words.next().unwrap_or(""), words.next()) {
        ("quit", None) => InputOutcome::Quit,
        ("resign", None) => match client_state.resign() {
            Ok(()) => InputOutcome::Clear,
            Err(err) => InputOutcome::Error(format!("Cannot resign: {err:?}")),
        },
        ("start", None) => {
            client_state.go_to_start();
            InputOutcome::Clear
        }
        ("prev", None) => {
            client_state.previous_move();
            InputOutcome::Clear
        }
        ("next", None) => {
            client_state.next_move();
            InputOutcome::Clear
        }
        ("end", None) => {
            client_state.go_to_end();
            InputOutcome::Clear
        }
        ("play", None) => {
            client_state.toggle_auto_play(now);
            InputOutcome::Clear
        }
        // Move numbers are shown 1-based.
        ("goto", Some(n)) => match n.parse::<MoveIndex>() {
            Ok(n) => {
                client_state.go_to_move(n - 1);
                InputOutcome::Clear
            }
            Err(_) => InputOutcome::Error(format!("Not a move number: '{n}'")),
        },
        _ => InputOutcome::Error(format!("Unknown command: '{cmd}'")),
    }
}

pub fn run(config: ClientCommandConfig) -> anyhow::Result<()> {
    let ClientCommandConfig { client_config, game_id, username, password } = config;
    client_config.validate().map_err(anyhow::Error::msg).context("Invalid configuration")?;
    let http = reqwest::blocking::Client::new();
    let session = rest::login(&http, &client_config.api_url, &username, &password)?;
    let user = session.user_info().cloned().context("Not logged in")?;

    let (tx, rx) = mpsc::channel();
    let transport = StompTransport::new(
        client_config.server_url.clone(),
        session.token().map(str::to_owned),
        tx.clone(),
    );
    let game_url = client_config.game_url(game_id);
    let mut client_state = ClientState::new(transport, user, client_config, game_id);

    let tx_fetch = tx.clone();
    let tx_local = tx.clone();
    let tx_tick = tx;
    thread::spawn(move || {
        let result = rest::fetch_game(&http, &game_url, game_id, &session);
        // The receiver is gone if the user has already quit.
        let _ = tx_fetch.send(IncomingEvent::GameFetched(result));
    });
    thread::spawn(move || {
        while let Ok(ev) = term_event::read() {
            if tx_local.send(IncomingEvent::Terminal(ev)).is_err() {
                break;
            }
        }
    });
    thread::spawn(move || {
        loop {
            thread::sleep(TICK_INTERVAL);
            if tx_tick.send(IncomingEvent::Tick).is_err() {
                break;
            }
        }
    });

    client_state.connect();

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    defer! {
        let _ = execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show);
        let _ = terminal::disable_raw_mode();
    };
    let app_start_time = Instant::now();

    let mut keyboard_input = String::new();
    let mut command_error = None;
    let mut reconnect = ReconnectSchedule::new();
    loop {
        let Ok(event) = rx.recv() else {
            anyhow::bail!(internal_error_message!("events stream ended"));
        };
        let now = Instant::now();
        let notable = match event {
            IncomingEvent::Network(event) => match client_state.process_transport_event(event) {
                Ok(notable) => notable,
                Err(err) => {
                    log::warn!("{err}");
                    NotableEvent::None
                }
            },
            IncomingEvent::GameFetched(result) => {
                // Without the game there is nothing to show.
                client_state.game_fetched(result, now).context("Cannot open the game")?
            }
            IncomingEvent::Terminal(term_event::Event::Key(event))
                if event.kind == KeyEventKind::Press =>
            {
                match event.code {
                    KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Char(ch) => keyboard_input.push(ch),
                    KeyCode::Backspace => {
                        keyboard_input.pop();
                    }
                    KeyCode::Left => {
                        client_state.previous_move();
                    }
                    KeyCode::Right => {
                        client_state.next_move();
                    }
                    KeyCode::Enter => {
                        command_error = None;
                        match execute_command(&mut client_state, keyboard_input.trim(), now) {
                            InputOutcome::Clear => keyboard_input.clear(),
                            InputOutcome::Keep => {}
                            InputOutcome::Error(message) => {
                                command_error = Some(message);
                                keyboard_input.clear();
                            }
                            InputOutcome::Quit => break,
                        }
                    }
                    _ => {}
                }
                NotableEvent::None
            }
            IncomingEvent::Terminal(_) => NotableEvent::None,
            IncomingEvent::Tick => {
                if reconnect.poll(now) {
                    client_state.reconnect(now);
                }
                client_state.tick(now)
            }
        };
        match notable {
            NotableEvent::GameLoaded => {
                execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
            }
            NotableEvent::Connected => {
                reconnect.connected();
                command_error = None;
            }
            NotableEvent::Disconnected => reconnect.connection_lost(now),
            NotableEvent::ConnectionTimedOut => {
                reconnect.connection_lost(now);
                command_error = Some("Cannot connect to the game server".to_owned());
            }
            NotableEvent::LocalMoveOverridden => {
                command_error = Some("The server did not accept your last move".to_owned());
            }
            _ => {}
        }
        render(&mut stdout, app_start_time, &client_state, &keyboard_input, &command_error)?;
    }
    client_state.leave();
    client_state.disconnect();
    Ok(())
}
