//! CLI for waterfall — live spectral bins in your browser or terminal.

mod channel;
mod commands;
mod tui;

use clap::{Parser, Subcommand};

use waterfall_server::producer::{DEFAULT_INTERVAL, DEFAULT_PRODUCER_PORT};

#[derive(Parser)]
#[command(name = "waterfall")]
#[command(about = "waterfall — live spectral bins in your browser or terminal")]
#[command(version = waterfall_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the browser viewer's static files
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = waterfall_server::DEFAULT_PORT)]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory holding the viewer files (waterfall/index.html etc.)
        #[arg(long, default_value = "web")]
        root: String,
    },

    /// Print each frame as a text chart; exits when the channel closes
    View {
        /// Channel URL (default: $WS_URL, then ws://127.0.0.1:8787)
        #[arg(long)]
        url: Option<String>,
    },

    /// Live waterfall heatmap in the terminal (TUI); reconnects until you quit
    Monitor {
        /// Channel URL
        #[arg(long, default_value = waterfall_core::DEFAULT_WS_URL)]
        url: String,

        /// Rows of history kept on screen
        #[arg(long, default_value_t = waterfall_core::DEFAULT_MAX_ROWS)]
        rows: usize,
    },

    /// Run the demo producer: a sweeping tone as log-spaced bins over WebSocket
    Produce {
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PRODUCER_PORT)]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Milliseconds between frames (minimum 10)
        #[arg(long, default_value_t = DEFAULT_INTERVAL.as_millis() as u64)]
        interval_ms: u64,

        /// Number of log-spaced bins per frame
        #[arg(long, default_value = "64")]
        bins: usize,

        /// Synthetic sample rate in Hz
        #[arg(long, default_value = "48000")]
        sample_rate: u32,

        /// FFT size (power of two)
        #[arg(long, default_value = "2048")]
        fft_size: usize,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, root } => commands::serve::run(&root, &host, port),
        Commands::View { url } => commands::view::run(url),
        Commands::Monitor { url, rows } => commands::monitor::run(&url, rows),
        Commands::Produce {
            port,
            host,
            interval_ms,
            bins,
            sample_rate,
            fft_size,
        } => commands::produce::run(commands::produce::ProduceCommandConfig {
            host: &host,
            port,
            interval_ms,
            bins,
            sample_rate,
            fft_size,
        }),
    }
}
