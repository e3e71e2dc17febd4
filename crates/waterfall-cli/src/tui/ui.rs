//! TUI rendering — one heatmap, newest rows on top.
//!
//! ┌──────────────────────────────────────────────┐
//! │  🌊 waterfall  ws://127.0.0.1:8787  connected │
//! ├──────────────────────────────────────────────┤
//! │▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀│
//! │▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀│
//! ├──────────────────────────────────────────────┤
//! │ bins 64  rows 200/200  max 0.812  20–22050 Hz│
//! ├──────────────────────────────────────────────┤
//! │  q: quit                                     │
//! └──────────────────────────────────────────────┘
//!
//! Each terminal cell shows two grid rows with an upper half block: the
//! foreground paints the upper row, the background the lower one.

use super::app::App;
use ratatui::{buffer::Buffer, prelude::*, widgets::*};
use waterfall_core::{ConnectionState, MatrixGrid, Rgb};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(4),    // heatmap
            Constraint::Length(1), // stats
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_heatmap(f, rows[1], app);
    draw_stats(f, rows[2], app);
    draw_keys(f, rows[3]);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let status_style = match app.state() {
        ConnectionState::Connected => Style::default().bold().fg(Color::Green),
        ConnectionState::Connecting => Style::default().fg(Color::Yellow),
        ConnectionState::Disconnected => Style::default().fg(Color::Red),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" 🌊 waterfall ", Style::default().bold().fg(Color::Cyan)),
            Span::styled(format!(" {} ", app.url()), Style::default().fg(Color::DarkGray)),
            Span::styled(format!(" {} ", app.status()), status_style),
        ]));

    f.render_widget(block, area);
}

fn draw_heatmap(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::LEFT | Borders::RIGHT);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Heatmap { grid: app.grid() }, inner);
}

fn draw_stats(f: &mut Frame, area: Rect, app: &App) {
    let session = app.session();
    let mut text = format!(
        " bins {}  rows {}/{}  max {:.3}  frames {}",
        session.bins(),
        session.history().len(),
        session.max_rows(),
        session.scale().color_max(),
        session.frames(),
    );
    if let Some((lo, hi)) = app.centers() {
        text.push_str(&format!("  {lo:.1}–{hi:.1} Hz"));
    }
    let p = Paragraph::new(text).style(Style::default().fg(Color::Yellow));
    f.render_widget(p, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(" q / Esc: quit")
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

// ---------------------------------------------------------------------------
// Heatmap widget
// ---------------------------------------------------------------------------

/// Scales a [`MatrixGrid`] onto the area, two grid rows per terminal row.
struct Heatmap<'a> {
    grid: &'a MatrixGrid,
}

impl Widget for Heatmap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let pixel_rows = usize::from(area.height) * 2;
        for cy in 0..area.height {
            for cx in 0..area.width {
                let top = sample(
                    self.grid,
                    cx.into(),
                    usize::from(cy) * 2,
                    area.width.into(),
                    pixel_rows,
                );
                let bottom = sample(
                    self.grid,
                    cx.into(),
                    usize::from(cy) * 2 + 1,
                    area.width.into(),
                    pixel_rows,
                );
                if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                    cell.set_symbol("▀")
                        .set_fg(to_color(top))
                        .set_bg(to_color(bottom));
                }
            }
        }
    }
}

/// Grid color under screen pixel `(px, py)` of a `width × pixel_rows`
/// canvas. `py = 0` is the top of the screen and shows the highest row.
fn sample(grid: &MatrixGrid, px: usize, py: usize, width: usize, pixel_rows: usize) -> Option<Rgb> {
    if grid.width() == 0 || grid.height() == 0 || width == 0 || pixel_rows == 0 {
        return None;
    }
    let x = px * grid.width() / width;
    let from_top = py * grid.height() / pixel_rows;
    let y = grid.height().checked_sub(from_top + 1)?;
    grid.get(x, y)
}

fn to_color(rgb: Option<Rgb>) -> Color {
    match rgb {
        Some(Rgb { r, g, b }) => Color::Rgb(r, g, b),
        None => Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterfall_core::{BinFrame, WaterfallSession};

    fn grid(rows: &[&[f64]], capacity: usize) -> MatrixGrid {
        let mut session = WaterfallSession::new(capacity);
        for r in rows {
            session.ingest(&BinFrame::new(r.to_vec()));
        }
        session.render()
    }

    #[test]
    fn test_sample_maps_newest_row_to_top_when_full() {
        let g = grid(&[&[0.0, 0.0], &[0.0, 10.0]], 2);
        // 4 columns x 2 pixel rows: one pixel row per grid row.
        assert_eq!(sample(&g, 3, 0, 4, 2), Some(Rgb::new(242, 0, 0)));
        assert_eq!(sample(&g, 0, 1, 4, 2), Some(Rgb::new(0, 0, 242)));
    }

    #[test]
    fn test_sample_leaves_unfilled_rows_empty() {
        let g = grid(&[&[1.0]], 4);
        // Only y = 0 holds data; it sits at the bottom.
        assert_eq!(sample(&g, 0, 0, 1, 4), None);
        assert!(sample(&g, 0, 3, 1, 4).is_some());
        assert_eq!(sample(&g, 0, 0, 0, 4), None);
    }

    #[test]
    fn test_heatmap_fills_area() {
        let g = grid(&[&[1.0, 2.0], &[3.0, 4.0]], 2);
        let area = Rect::new(0, 0, 4, 1);
        let mut buf = Buffer::empty(area);
        Heatmap { grid: &g }.render(area, &mut buf);
        for x in 0..4 {
            let cell = &buf[(x, 0)];
            assert_eq!(cell.symbol(), "▀");
            assert!(matches!(cell.fg, Color::Rgb(..)));
            assert!(matches!(cell.bg, Color::Rgb(..)));
        }
    }
}
