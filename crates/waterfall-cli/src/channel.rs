//! Tokio driver for [`StreamClient`].
//!
//! One task, one `select!`: the next socket message, the pending reconnect
//! deadline and the cancel signal. Each event is handed to the client and
//! the returned [`Directive`] is carried out before waiting again, so frames
//! are processed strictly one at a time.

use std::future::pending;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use waterfall_core::scheduler::{Scheduler, TimerId};
use waterfall_core::{Directive, FrameSink, SessionEnd, StreamClient};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// DeadlineScheduler
// ---------------------------------------------------------------------------

/// Timers as tokio deadlines. The driver sleeps until the earliest one.
#[derive(Debug, Default)]
pub struct DeadlineScheduler {
    next_id: u64,
    pending: Vec<(TimerId, Instant)>,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest armed timer.
    pub fn next_deadline(&self) -> Option<(TimerId, Instant)> {
        self.pending.iter().copied().min_by_key(|&(_, at)| at)
    }

    /// Forget a timer that has fired.
    pub fn fired(&mut self, id: TimerId) {
        self.pending.retain(|&(pending, _)| pending != id);
    }
}

impl Scheduler for DeadlineScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId::new(self.next_id);
        self.pending.push((id, Instant::now() + delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.fired(id);
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

enum Event {
    Socket(Option<Result<Message, tungstenite::Error>>),
    Timer(TimerId),
    Cancel,
}

/// Resolves once `true` has been sent on `cancel`. A dropped sender never
/// cancels.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            pending::<()>().await;
        }
    }
}

async fn next_message(socket: &mut Option<Socket>) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(ws) => ws.next().await,
        None => pending().await,
    }
}

async fn timer_fired(deadline: Option<(TimerId, Instant)>) -> TimerId {
    match deadline {
        Some((id, at)) => {
            tokio::time::sleep_until(at).await;
            id
        }
        None => pending().await,
    }
}

/// Run `client` until it exits, either on its own (terminate policy) or
/// after `cancel` fires.
pub async fn drive<S: FrameSink>(
    client: &mut StreamClient<S, DeadlineScheduler>,
    mut cancel: watch::Receiver<bool>,
) -> SessionEnd {
    let mut socket: Option<Socket> = None;
    let mut directive = client.start();

    loop {
        match directive {
            Directive::Continue => {}
            Directive::Connect => {
                let url = client.url().to_string();
                let attempt = tokio::select! {
                    result = tokio_tungstenite::connect_async(url.as_str()) => Some(result),
                    _ = cancelled(&mut cancel) => None,
                };
                directive = match attempt {
                    Some(Ok((ws, _))) => {
                        socket = Some(ws);
                        client.on_open()
                    }
                    Some(Err(e)) => client.on_error(&e.to_string()),
                    None => client.shutdown(),
                };
                continue;
            }
            Directive::CloseChannel => {
                if let Some(mut ws) = socket.take() {
                    // The peer may already be gone; the close is best effort.
                    let _ = ws.close(None).await;
                }
                directive = client.on_close();
                continue;
            }
            Directive::Exit(end) => return end,
        }

        let deadline = client.scheduler().next_deadline();
        let event = tokio::select! {
            msg = next_message(&mut socket) => Event::Socket(msg),
            id = timer_fired(deadline) => Event::Timer(id),
            _ = cancelled(&mut cancel) => Event::Cancel,
        };

        directive = match event {
            Event::Socket(Some(Ok(Message::Text(text)))) => client.on_message(text.as_str()),
            // Closing again flushes the reply tungstenite queued for the peer.
            Event::Socket(Some(Ok(Message::Close(_)))) => Directive::CloseChannel,
            Event::Socket(None) => {
                socket = None;
                client.on_close()
            }
            Event::Socket(Some(Ok(_))) => Directive::Continue,
            Event::Socket(Some(Err(e))) => client.on_error(&e.to_string()),
            Event::Timer(id) => {
                client.scheduler_mut().fired(id);
                client.on_timer(id)
            }
            Event::Cancel => client.shutdown(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use waterfall_core::{BinFrame, ReconnectPolicy, Status};

    #[derive(Default)]
    struct Collect {
        frames: Vec<Vec<f64>>,
        statuses: Vec<String>,
    }

    impl FrameSink for Collect {
        fn accept(&mut self, frame: &BinFrame) {
            self.frames.push(frame.bins.clone());
        }

        fn status(&mut self, status: &Status) {
            self.statuses.push(status.to_string());
        }
    }

    #[test]
    fn test_deadline_scheduler_orders_and_cancels() {
        let mut s = DeadlineScheduler::new();
        let slow = s.schedule(Duration::from_secs(5));
        let fast = s.schedule(Duration::from_millis(5));
        assert_eq!(s.next_deadline().map(|(id, _)| id), Some(fast));
        s.cancel(fast);
        assert_eq!(s.next_deadline().map(|(id, _)| id), Some(slow));
        s.fired(slow);
        assert!(s.next_deadline().is_none());
    }

    /// Producer that sends the given payloads, then closes. The handle
    /// resolves to whether the viewer completed the closing handshake.
    async fn one_shot_producer(
        payloads: Vec<&'static str>,
    ) -> (String, tokio::task::JoinHandle<bool>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for p in payloads {
                ws.send(Message::text(p)).await.unwrap();
            }
            ws.close(None).await.unwrap();
            // Drain until the viewer acknowledges the close.
            loop {
                match ws.next().await {
                    Some(Ok(_)) => {}
                    Some(Err(_)) => return false,
                    None => return true,
                }
            }
        });
        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_terminating_viewer_reads_until_close() {
        let (url, _producer) = one_shot_producer(vec![
            r#"{"bins":[1,2,3]}"#,
            "garbage",
            r#"{"bins":[4,5]}"#,
        ])
        .await;
        let (_tx, rx) = watch::channel(false);
        let mut client = StreamClient::new(
            url,
            ReconnectPolicy::Terminate,
            Collect::default(),
            DeadlineScheduler::new(),
        );

        let end = drive(&mut client, rx).await;
        assert_eq!(end, SessionEnd::Closed);
        assert_eq!(
            client.sink().frames,
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]]
        );
        assert_eq!(
            client.sink().statuses,
            vec!["connecting…", "connected", "disconnected"]
        );
    }

    #[tokio::test]
    async fn test_peer_close_is_acknowledged() {
        let (url, producer) = one_shot_producer(vec![r#"{"bins":[1]}"#]).await;
        let (_tx, rx) = watch::channel(false);
        let mut client = StreamClient::new(
            url,
            ReconnectPolicy::Terminate,
            Collect::default(),
            DeadlineScheduler::new(),
        );

        assert_eq!(drive(&mut client, rx).await, SessionEnd::Closed);
        let clean = tokio::time::timeout(Duration::from_secs(5), producer)
            .await
            .unwrap()
            .unwrap();
        assert!(clean, "viewer dropped the socket without answering the close");
        assert_eq!(client.sink().statuses.last().map(String::as_str), Some("disconnected"));
    }

    #[tokio::test]
    async fn test_refused_connection_fails_terminating_viewer() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let (_tx, rx) = watch::channel(false);
        let mut client = StreamClient::new(
            format!("ws://{addr}"),
            ReconnectPolicy::Terminate,
            Collect::default(),
            DeadlineScheduler::new(),
        );
        let end = drive(&mut client, rx).await;
        assert!(matches!(end, SessionEnd::Failed(_)));
        assert_eq!(end.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_retrying_viewer() {
        let addr = {
            let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let (tx, rx) = watch::channel(false);
        let mut client = StreamClient::new(
            format!("ws://{addr}"),
            ReconnectPolicy::Retry {
                delay: Duration::from_millis(20),
            },
            Collect::default(),
            DeadlineScheduler::new(),
        );

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let _ = tx.send(true);
        });
        let end = drive(&mut client, rx).await;
        assert_eq!(end, SessionEnd::Cancelled);
        assert!(client.scheduler().next_deadline().is_none());
        assert!(client.is_torn_down());
        let retries = client
            .sink()
            .statuses
            .iter()
            .filter(|s| s.as_str() == "disconnected (reconnecting…)")
            .count();
        assert!(retries >= 1);
    }
}
