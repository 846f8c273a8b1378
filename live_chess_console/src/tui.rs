use console::Style;
use itertools::Itertools;

use live_chess::client::GameView;
use live_chess::coord::{Coord, NUM_COLS, NUM_ROWS};
use live_chess::display::{
    BoardView, DisplayCoord, HistoryEntry, HistoryRow, captured_summary, from_display_coord,
};
use live_chess::force::Force;
use live_chess::piece::{PieceKind, piece_to_pictogram};
use live_chess::replay::ReplayMode;


const HISTORY_ROWS_SHOWN: usize = 12;

pub fn render_game(view: &GameView) -> String {
    let board = &view.board;
    let (top, bottom) = match view.my_force {
        Some(Force::Black) => (Force::White, Force::Black),
        Some(Force::White) | None => (Force::Black, Force::White),
    };
    let board_lines = format!(
        "{}\n{}{}\n{}",
        render_captured(board, top),
        render_grid(board),
        render_captured(board, bottom),
        render_replay_line(board),
    );
    let history_lines = render_history(&view.history);
    let left_width = (NUM_COLS as usize + 2) * 3;
    let body = board_lines
        .lines()
        .zip_longest(history_lines.lines())
        .map(|pair| {
            let (left, right) = pair.or_default();
            let padding = left_width.saturating_sub(console::measure_text_width(left));
            format!("{left}{}    {right}", " ".repeat(padding))
        })
        .join("\n");
    format!("{}\n\n{body}\n", render_status(view))
}

pub fn render_status(view: &GameView) -> String {
    let style = if view.is_local_turn { Style::new().bold().green() } else { Style::new() };
    format!("vs {}    {}", view.opponent, style.apply_to(&view.status))
}

fn render_captured(board: &BoardView, force: Force) -> String {
    format!("   {}", captured_summary(&board.captured, force))
}

fn render_replay_line(board: &BoardView) -> String {
    let style = Style::new().color256(233).on_color256(194);
    match board.replay_mode {
        ReplayMode::Live => String::new(),
        ReplayMode::Scrubbing => {
            style.apply_to(format!(" replay: move {} ", board.replay_index + 1)).to_string()
        }
        ReplayMode::Playing => {
            style.apply_to(format!(" playing: move {} ", board.replay_index + 1)).to_string()
        }
    }
}

fn render_history(rows: &[HistoryRow]) -> String {
    let cell = |entry: &HistoryEntry| {
        let text = format!("{:<8}", entry.notation);
        if entry.current { Style::new().reverse().apply_to(text).to_string() } else { text }
    };
    let skip = rows.len().saturating_sub(HISTORY_ROWS_SHOWN);
    rows.iter()
        .skip(skip)
        .map(|row| {
            let black = row.black.as_ref().map(cell).unwrap_or_default();
            format!("{:>3}. {}{}", row.number, cell(&row.white), black)
        })
        .join("\n")
}

fn render_grid(board: &BoardView) -> String {
    let colors = [
        Style::new().color256(233).on_color256(222),
        Style::new().color256(233).on_color256(230),
    ];
    let highlight = Style::new().color256(233).on_color256(186);
    let check = Style::new().color256(233).on_color256(210);
    let is_last_move = |coord: Coord| {
        board.last_move.is_some_and(|(from, to)| coord == from || coord == to)
    };
    let mut ret = String::new();
    for y in -1..=(NUM_ROWS as i32) {
        for x in -1..=(NUM_COLS as i32) {
            let row_header = x < 0 || x >= NUM_COLS.into();
            let col_header = y < 0 || y >= NUM_ROWS.into();
            let square = match (row_header, col_header) {
                (true, true) => format_square(' '),
                (true, false) => {
                    format_square(display_coord(board, 0, y).map_or(' ', |c| c.row.to_algebraic()))
                }
                (false, true) => {
                    format_square(display_coord(board, x, 0).map_or(' ', |c| c.col.to_algebraic()))
                }
                (false, false) => match display_coord(board, x, y) {
                    Some(coord) => {
                        let piece = board.board[coord];
                        let king_in_check = board.in_check
                            && piece.is_some_and(|p| {
                                p.kind == PieceKind::King && p.force == board.side_to_move
                            });
                        let color_idx = (coord.row.to_zero_based() + coord.col.to_zero_based()) % 2;
                        let style = if king_in_check {
                            &check
                        } else if is_last_move(coord) {
                            &highlight
                        } else {
                            &colors[usize::from(color_idx)]
                        };
                        let ch = piece.map_or(' ', |p| piece_to_pictogram(p.kind, p.force));
                        style.apply_to(format_square(ch)).to_string()
                    }
                    None => format_square('?'),
                },
            };
            ret.push_str(&square);
        }
        ret.push('\n');
    }
    ret
}

fn display_coord(board: &BoardView, x: i32, y: i32) -> Option<Coord> {
    let x = u8::try_from(x).ok()?;
    let y = u8::try_from(y).ok()?;
    from_display_coord(DisplayCoord { x, y }, board.orientation)
}

fn format_square(ch: char) -> String { format!(" {ch} ") }
