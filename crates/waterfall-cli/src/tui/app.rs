//! TUI application state and event loop.
//!
//! Design: the channel driver owns everything. [`MonitorSink`] folds each
//! frame into the [`App`] and redraws on the spot; a helper thread only
//! watches the keyboard and raises the quit signal. Nothing is shared behind
//! a lock.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::sync::watch;

use waterfall_core::{
    BinFrame, ConnectionState, FrameSink, MatrixGrid, ReconnectPolicy, Status, StreamClient,
    WaterfallSession,
};

use crate::channel::{DeadlineScheduler, drive};

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    url: String,
    session: WaterfallSession,
    grid: MatrixGrid,
    status: String,
    state: ConnectionState,
    centers: Option<(f64, f64)>,
}

impl App {
    pub fn new(url: &str, rows: usize) -> Self {
        let mut session = WaterfallSession::new(rows);
        let grid = session.render();
        Self {
            url: url.to_string(),
            session,
            grid,
            status: String::new(),
            state: ConnectionState::Disconnected,
            centers: None,
        }
    }

    /// Fold one frame in and re-render the grid.
    pub fn ingest(&mut self, frame: &BinFrame) {
        self.session.ingest(frame);
        if self.centers.is_none()
            && let Some(centers) = frame.centers.as_deref()
            && let (Some(&lo), Some(&hi)) = (centers.first(), centers.last())
        {
            self.centers = Some((lo, hi));
        }
        self.grid = self.session.render();
    }

    pub fn set_status(&mut self, status: &Status) {
        if let Some(state) = status.state() {
            self.state = state;
        }
        self.status = status.to_string();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn grid(&self) -> &MatrixGrid {
        &self.grid
    }

    pub fn session(&self) -> &WaterfallSession {
        &self.session
    }

    /// First and last frequency center, once the producer sent them.
    pub fn centers(&self) -> Option<(f64, f64)> {
        self.centers
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Graphical sink: updates the app and draws after every change.
pub struct MonitorSink<B: Backend> {
    app: App,
    terminal: Terminal<B>,
    quit: Arc<watch::Sender<bool>>,
    error: Option<io::Error>,
}

impl<B: Backend> MonitorSink<B> {
    pub fn new(app: App, terminal: Terminal<B>, quit: Arc<watch::Sender<bool>>) -> Self {
        Self {
            app,
            terminal,
            quit,
            error: None,
        }
    }

    /// Draw the current state. The first failure stops the session.
    pub fn redraw(&mut self) {
        if self.error.is_some() {
            return;
        }
        let app = &self.app;
        if let Err(e) = self.terminal.draw(|f| super::ui::draw(f, app)) {
            self.error = Some(e);
            let _ = self.quit.send(true);
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    fn into_parts(self) -> (Terminal<B>, Option<io::Error>) {
        (self.terminal, self.error)
    }
}

impl<B: Backend> FrameSink for MonitorSink<B> {
    fn accept(&mut self, frame: &BinFrame) {
        self.app.ingest(frame);
        self.redraw();
    }

    fn status(&mut self, status: &Status) {
        self.app.set_status(status);
        self.redraw();
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Watch the keyboard until a quit key or until someone else quits.
fn spawn_key_reader(quit: Arc<watch::Sender<bool>>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !*quit.borrow() {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press && is_quit(&key) => {
                        let _ = quit.send(true);
                    }
                    Ok(_) => {}
                    Err(_) => {
                        let _ = quit.send(true);
                    }
                },
                Ok(false) => {}
                Err(_) => {
                    let _ = quit.send(true);
                }
            }
        }
    })
}

/// Run the monitor until the user quits.
pub fn run(url: &str, rows: usize) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;

    // Install panic hook that restores terminal before printing the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
        original_hook(info);
    }));

    let (quit_tx, quit_rx) = watch::channel(false);
    let quit = Arc::new(quit_tx);
    let keys = spawn_key_reader(Arc::clone(&quit));

    let mut sink = MonitorSink::new(App::new(url, rows), terminal, Arc::clone(&quit));
    sink.redraw();
    let mut client = StreamClient::new(
        url,
        ReconnectPolicy::default(),
        sink,
        DeadlineScheduler::new(),
    );

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map(|rt| rt.block_on(drive(&mut client, quit_rx)));

    let _ = quit.send(true);
    let _ = keys.join();

    let (mut terminal, draw_error) = client.into_sink().into_parts();

    // Always restore terminal, even if the loop returned an error.
    let _ = std::panic::take_hook(); // remove our hook
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;

    let end = result?;
    log::debug!("monitor session ended: {end}");
    match draw_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                text.push_str(buf[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn test_sink() -> MonitorSink<TestBackend> {
        let (tx, _rx) = watch::channel(false);
        let terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        MonitorSink::new(App::new("ws://127.0.0.1:8787", 10), terminal, Arc::new(tx))
    }

    #[test]
    fn test_app_tracks_status_and_centers() {
        let mut app = App::new("ws://x", 4);
        app.set_status(&Status::Connected {
            url: "ws://x".into(),
        });
        assert_eq!(app.state(), ConnectionState::Connected);
        assert_eq!(app.status(), "connected");

        app.set_status(&Status::ChannelError {
            message: "boom".into(),
            retrying: true,
        });
        assert_eq!(app.state(), ConnectionState::Connected);
        assert_eq!(app.status(), "error (reconnecting…)");

        let frame = BinFrame {
            bins: vec![1.0, 2.0],
            centers: Some(Arc::from(vec![21.0, 480.0, 22000.0])),
        };
        app.ingest(&frame);
        assert_eq!(app.centers(), Some((21.0, 22000.0)));
        assert_eq!(app.grid().width(), 2);
        assert_eq!(app.grid().height(), 4);
        assert_eq!(app.session().frames(), 1);
    }

    #[test]
    fn test_sink_draws_status_and_stats() {
        let mut sink = test_sink();
        sink.status(&Status::Connecting {
            url: "ws://127.0.0.1:8787".into(),
        });
        sink.status(&Status::Connected {
            url: "ws://127.0.0.1:8787".into(),
        });
        sink.accept(&BinFrame::new(vec![0.0, 1.0, 2.0, 3.0]));

        let text = screen_text(sink.terminal());
        assert!(text.contains("waterfall"));
        assert!(text.contains("connected"));
        assert!(text.contains("ws://127.0.0.1:8787"));
        assert!(text.contains("bins 4"));
        assert!(text.contains("rows 1/10"));
        assert_eq!(sink.app().session().frames(), 1);
    }

    #[test]
    fn test_quit_keys() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&key(KeyCode::Char('x'), KeyModifiers::NONE)));
    }
}
