//! One-shot terminal viewer: redraws a text chart per frame and exits when
//! the channel goes away (0 on close, 1 on error).

use std::io::{self, Write};

use waterfall_core::{
    AsciiRenderer, BinFrame, FrameSink, ReconnectPolicy, Status, StreamClient, TerminalConfig,
};

use crate::channel::{DeadlineScheduler, drive};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Sink that prints every frame as a full screen.
struct ChartSink {
    config: TerminalConfig,
    renderer: AsciiRenderer,
}

impl ChartSink {
    fn new(config: TerminalConfig) -> Self {
        Self {
            config,
            renderer: AsciiRenderer::default(),
        }
    }

    fn write(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

impl FrameSink for ChartSink {
    fn accept(&mut self, frame: &BinFrame) {
        self.write(&render_screen(&self.config, &self.renderer, frame));
    }

    fn status(&mut self, status: &Status) {
        match status {
            Status::Connected { url } => self.write(&format!("Connected: {url}\n")),
            Status::Disconnected { .. } => self.write("Disconnected\n"),
            Status::ChannelError { .. } => eprintln!("{status}"),
            Status::Connecting { .. } => {}
        }
    }
}

/// Banner, chart and footer for one frame, starting with a screen clear.
fn render_screen(config: &TerminalConfig, renderer: &AsciiRenderer, frame: &BinFrame) -> String {
    let hearts = "❤️".repeat(40);
    let mut screen = String::from(CLEAR_SCREEN);
    screen.push_str(&format!("{hearts}\n"));
    screen.push_str(&format!(
        "For {} ({}) — with lots of love\n",
        config.viewer_name,
        config.age_label()
    ));
    screen.push_str(&format!("{hearts}\n\n"));
    screen.push_str(&renderer.render(frame));
    screen.push_str(&format!("\n{}\n", "💖".repeat(24)));
    screen
}

pub fn run(url: Option<String>) {
    let mut config = TerminalConfig::from_env();
    if let Some(url) = url {
        config.ws_url = url;
    }

    let mut client = StreamClient::new(
        config.ws_url.clone(),
        ReconnectPolicy::Terminate,
        ChartSink::new(config),
        DeadlineScheduler::new(),
    );

    let cancel = super::ctrlc_signal();
    let rt = super::runtime();
    let end = rt.block_on(drive(&mut client, cancel));
    log::debug!("viewer session ended: {end}");
    std::process::exit(end.exit_code());
}
