// Offline replay of a saved game snapshot (the JSON the server returns for a game).

use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self as term_event, KeyCode, KeyEventKind};
use crossterm::style::{self, Stylize};
use crossterm::{cursor, execute, terminal};
use instant::Instant;
use scopeguard::defer;

use live_chess::altered_game::AlteredGame;
use live_chess::client::game_view;
use live_chess::config::ClientConfig;
use live_chess::game::{Game, UserId};
use live_chess::replay::{ReplayDestination, ReplayState};

use crate::rest;
use crate::tui;


const TICK_INTERVAL: Duration = Duration::from_millis(50);
// Nobody plays in an offline replay. Ids are assigned by the server starting from 1.
const VIEWER_ID: UserId = 0;

pub struct ReplayCommandConfig {
    pub client_config: ClientConfig,
    pub game_file: String,
    pub auto_play: bool,
}

enum IncomingEvent {
    Terminal(term_event::Event),
    Tick,
}

pub fn load_game(path: &str) -> anyhow::Result<Game> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Cannot read game file {path}"))?;
    rest::parse_game(&contents).with_context(|| format!("Cannot parse game file {path}"))
}

fn render(stdout: &mut io::Stdout, alt_game: &AlteredGame) -> io::Result<()> {
    execute!(stdout, cursor::MoveTo(0, 0))?;
    let view = game_view(alt_game, None);
    for line in tui::render_game(&view).split('\n') {
        execute!(stdout, style::Print(line), cursor::MoveToNextLine(1))?;
    }
    let help = "←/→ step   Home/End jump   Space play/pause   q quit";
    execute!(
        stdout,
        style::Print(help.with(style::Color::DarkGrey)),
        terminal::Clear(terminal::ClearType::FromCursorDown)
    )?;
    Ok(())
}

pub fn run(config: ReplayCommandConfig) -> anyhow::Result<()> {
    let ReplayCommandConfig { client_config, game_file, auto_play } = config;
    client_config.validate().map_err(anyhow::Error::msg).context("Invalid configuration")?;
    let game = load_game(&game_file)?;
    log::info!("Replaying game {} ({} moves)", game.id, game.moves.len());
    let replay = ReplayState::new(client_config.replay_step_interval);
    let mut alt_game = AlteredGame::new(VIEWER_ID, game, client_config.auto_promotion, replay);
    if auto_play {
        alt_game.toggle_auto_play(Instant::now());
    } else {
        alt_game.replay_to(ReplayDestination::First);
    }

    let (tx, rx) = mpsc::channel();
    let tx_local = tx.clone();
    let tx_tick = tx;
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

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    defer! {
        let _ = execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show);
        let _ = terminal::disable_raw_mode();
    };

    render(&mut stdout, &alt_game)?;
    for event in rx {
        let now = Instant::now();
        let changed = match event {
            IncomingEvent::Terminal(term_event::Event::Key(event))
                if event.kind == KeyEventKind::Press =>
            {
                match event.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Left => alt_game.replay_to(ReplayDestination::Previous),
                    KeyCode::Right => alt_game.replay_to(ReplayDestination::Next),
                    KeyCode::Home => alt_game.replay_to(ReplayDestination::First),
                    KeyCode::End => alt_game.replay_to(ReplayDestination::Last),
                    KeyCode::Char(' ') => alt_game.toggle_auto_play(now),
                    _ => continue,
                };
                true
            }
            IncomingEvent::Terminal(term_event::Event::Resize(..)) => true,
            IncomingEvent::Terminal(_) => false,
            IncomingEvent::Tick => alt_game.tick(now),
        };
        if changed {
            render(&mut stdout, &alt_game)?;
        }
    }
    Ok(())
}
