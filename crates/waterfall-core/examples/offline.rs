//! Offline pipeline example.
//!
//! Feeds a few synthetic frames through the decoder and session without a
//! network, then prints the last frame as a text chart and the newest
//! heatmap row as RGB triples.
//!
//! Run: `cargo run --example offline`

use waterfall_core::{AsciiRenderer, FrameDecoder, SyntheticSource, WaterfallSession};

fn main() {
    let mut source = SyntheticSource::default();
    let mut decoder = FrameDecoder::new();
    let mut session = WaterfallSession::new(16);

    let mut last = None;
    for _ in 0..24 {
        let payload = source.next_payload();
        if let Some(frame) = decoder.decode(&payload) {
            session.ingest(&frame);
            last = Some(frame);
        }
    }

    println!(
        "Frames: {}  rows: {}/{}  tone: {:.1} Hz",
        session.frames(),
        session.history().len(),
        session.max_rows(),
        source.tone_hz()
    );

    if let Some(frame) = &last {
        println!("{}", AsciiRenderer::default().render(frame));
    }

    // Newest row sits at the highest y.
    let grid = session.render();
    if let Some(y) = grid.height().checked_sub(1) {
        let row: Vec<String> = grid
            .row(y)
            .iter()
            .flatten()
            .take(8)
            .map(|rgb| rgb.to_string())
            .collect();
        println!("Newest row (first 8 cells): {}", row.join(" "));
    }
}
