//! # waterfall-core
//!
//! **Live spectral magnitudes, drawn as a scrolling heatmap.**
//!
//! `waterfall-core` is the runtime-agnostic pipeline behind every waterfall
//! viewer. A producer streams JSON frames of magnitude "bins" over a
//! WebSocket; this crate decodes them, keeps a bounded history, normalizes
//! values against a slowly decaying peak and renders either a colored matrix
//! or a text line chart. It does no I/O of its own, so the same code runs in
//! the terminal (tokio) and in the browser (wasm).
//!
//! ## Quick Start
//!
//! ```
//! use waterfall_core::{FrameDecoder, WaterfallSession};
//!
//! let mut decoder = FrameDecoder::new();
//! let mut session = WaterfallSession::new(200);
//!
//! let frame = decoder.decode(r#"{"bins":[0.1, 0.8, 0.3]}"#).unwrap();
//! session.ingest(&frame);
//!
//! let grid = session.render();
//! assert_eq!(grid.width(), 3);
//! assert_eq!(grid.height(), 200);
//! ```
//!
//! ## Architecture
//!
//! Channel → [`StreamClient`] → [`FrameDecoder`] → [`FrameSink`] → renderer
//!
//! - [`StreamClient`] owns the connection lifecycle and the reconnect policy.
//!   Drivers feed it socket events and timer firings and act on the
//!   [`Directive`] it returns.
//! - A graphical sink folds frames into a [`WaterfallSession`]
//!   ([`HistoryBuffer`] + [`ColorScale`] + [`MatrixRenderer`]).
//! - The terminal sink prints each frame through [`AsciiRenderer`].
//!
//! The demo producer side lives in [`synth`]: a sweeping tone analyzed into
//! [`LogBins`] and encoded with [`encode_frame`].

pub mod ascii;
pub mod client;
pub mod color;
pub mod config;
pub mod frame;
pub mod history;
pub mod logbins;
pub mod matrix;
pub mod scheduler;
pub mod session;
pub mod synth;

pub use ascii::{AsciiRenderer, DEFAULT_CHART_HEIGHT, DEFAULT_MAX_POINTS, downsample};
pub use client::{
    ConnectionState, DEFAULT_RECONNECT_DELAY, Directive, FrameSink, ReconnectPolicy, SessionEnd,
    Status, StreamClient,
};
pub use color::{ColorScale, Rgb, map_to_color};
pub use config::{DEFAULT_WS_URL, TerminalConfig, ViewerConfig, viewer_url};
pub use frame::{BinFrame, BinRow, FrameDecoder, encode_frame};
pub use history::{Cell, DEFAULT_MAX_ROWS, HistoryBuffer};
pub use logbins::{LogBins, LogBinsConfig};
pub use matrix::{AxisExtent, DEFAULT_BINS, MatrixGrid, MatrixRenderer};
pub use scheduler::{ManualScheduler, Scheduler, TimerId};
pub use session::WaterfallSession;
pub use synth::{SpectrumAnalyzer, SyntheticSource, ToneSweep};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
