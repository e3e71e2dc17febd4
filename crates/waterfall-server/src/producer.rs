//! Demo bins producer.
//!
//! Every WebSocket client gets its own [`SyntheticSource`] and a frame per
//! tick. Clients never share a generator, so there is nothing to fan out.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use tokio::time::MissedTickBehavior;

use waterfall_core::{LogBinsConfig, SyntheticSource};

/// Default port of the producer channel (`ws://127.0.0.1:8787`).
pub const DEFAULT_PRODUCER_PORT: u16 = 8787;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest accepted frame interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProducerConfig {
    /// Time between frames; raised to [`MIN_INTERVAL`].
    pub interval: Duration,
    pub bands: LogBinsConfig,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            bands: LogBinsConfig::default(),
        }
    }
}

impl ProducerConfig {
    fn clamped(mut self) -> Self {
        self.interval = self.interval.max(MIN_INTERVAL);
        self
    }
}

async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(config): State<Arc<ProducerConfig>>,
) -> Response {
    ws.on_upgrade(move |socket| stream_frames(socket, config))
}

/// Push frames to one client until it leaves.
async fn stream_frames(mut socket: WebSocket, config: Arc<ProducerConfig>) {
    log::info!("producer client connected");
    let mut source = SyntheticSource::new(config.bands);
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = source.next_payload();
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break; // Client disconnected
                }
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    log::warn!("producer socket error: {e}");
                    break;
                }
                Some(Ok(_)) => {} // Viewers have nothing to say
            }
        }
    }
    log::info!("producer client disconnected");
}

/// Router that upgrades any path to a frame stream.
pub fn producer_router(config: ProducerConfig) -> Router {
    Router::new()
        .fallback(handle_upgrade)
        .with_state(Arc::new(config.clamped()))
}

/// Run the demo producer until it fails.
pub async fn run_producer(host: &str, port: u16, config: ProducerConfig) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    log::info!(
        "producing frames every {:?} on ws://{}",
        config.clamped().interval,
        listener.local_addr()?
    );
    axum::serve(listener, producer_router(config)).await
}
