//! Per-viewer waterfall state.
//!
//! Everything one graphical viewer remembers between frames lives here: the
//! history window, the adaptive color scale and the renderer's axis state.
//! Two sessions never share any of it.

use crate::color::ColorScale;
use crate::frame::BinFrame;
use crate::history::HistoryBuffer;
use crate::matrix::{MatrixGrid, MatrixRenderer};

#[derive(Debug, Clone)]
pub struct WaterfallSession {
    history: HistoryBuffer,
    scale: ColorScale,
    renderer: MatrixRenderer,
    frames: u64,
}

impl WaterfallSession {
    pub fn new(max_rows: usize) -> Self {
        let history = HistoryBuffer::new(max_rows);
        let renderer = MatrixRenderer::new(history.capacity());
        Self {
            history,
            scale: ColorScale::new(),
            renderer,
            frames: 0,
        }
    }

    /// Fold one frame into the session.
    ///
    /// Returns `true` when the bin count changed, so surfaces can relabel
    /// their axes.
    pub fn ingest(&mut self, frame: &BinFrame) -> bool {
        let width_changed = self.renderer.sync_width(frame.len());
        let row = frame.to_row();
        self.scale.update(row.max());
        self.history.push(row);
        self.frames += 1;
        width_changed
    }

    /// Full redraw of the current state.
    pub fn render(&mut self) -> MatrixGrid {
        self.renderer.render(&self.history, &self.scale)
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Bin count of the newest row, or the renderer default before any row.
    pub fn bins(&self) -> usize {
        self.renderer.width()
    }

    pub fn max_rows(&self) -> usize {
        self.history.capacity()
    }

    /// Frames ingested since the session started.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::matrix::DEFAULT_BINS;

    #[test]
    fn ingest_updates_history_and_scale() {
        let mut s = WaterfallSession::new(3);
        assert!(s.ingest(&BinFrame::new(vec![1.0, 0.0, 0.0])));
        assert!(!s.ingest(&BinFrame::new(vec![0.0, 5.0, 0.0])));
        s.ingest(&BinFrame::new(vec![0.0, 0.0, 10.0]));

        assert_eq!(s.history().len(), 3);
        assert_eq!(s.scale().color_max(), 10.0);
        assert_eq!(s.frames(), 3);

        let grid = s.render();
        assert_eq!(grid.get(2, 2), Some(Rgb::new(242, 0, 0)));
    }

    #[test]
    fn width_change_is_reported() {
        let mut s = WaterfallSession::new(10);
        assert_eq!(s.bins(), DEFAULT_BINS);
        assert!(!s.ingest(&BinFrame::new(vec![0.5; DEFAULT_BINS])));
        assert!(s.ingest(&BinFrame::new(vec![0.5; 32])));
        assert_eq!(s.bins(), 32);
        assert_eq!(s.render().width(), 32);
    }

    #[test]
    fn sessions_are_independent() {
        let mut a = WaterfallSession::new(4);
        let b = WaterfallSession::new(4);
        a.ingest(&BinFrame::new(vec![100.0]));
        assert_eq!(a.scale().color_max(), 100.0);
        assert!(b.history().is_empty());
        assert_eq!(b.scale().color_max(), crate::color::FLOOR);
    }
}
