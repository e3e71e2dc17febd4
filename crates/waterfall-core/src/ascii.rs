//! Text line chart of a single frame for the terminal viewer.
//!
//! Stateless across frames; the only thing carried over is the session's
//! frequency centers, which arrive already latched on the frame.
//!
//! ```text
//!      0.91 ┤      ╭╮
//!      0.45 ┤   ╭──╯╰╮
//!      0.00 ┼───╯    ╰────
//! ```

use crate::frame::BinFrame;

/// Terminal width budget in samples.
pub const DEFAULT_MAX_POINTS: usize = 64;

/// Chart height in text rows (above the baseline).
pub const DEFAULT_CHART_HEIGHT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsciiRenderer {
    max_points: usize,
    height: usize,
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            height: DEFAULT_CHART_HEIGHT,
        }
    }
}

impl AsciiRenderer {
    pub fn new(max_points: usize, height: usize) -> Self {
        Self {
            max_points: max_points.max(1),
            height: height.max(1),
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Title, chart and (when known) the centers line.
    pub fn render(&self, frame: &BinFrame) -> String {
        let series = downsample(&frame.bins, self.max_points);
        let mut out = format!("Audio log bins ({})\n", frame.len());
        let chart = plot(&series, self.height);
        if !chart.is_empty() {
            out.push_str(&chart);
            out.push('\n');
        }
        if let Some(centers) = frame.centers.as_deref() {
            out.push_str(&centers_line(centers));
            out.push('\n');
        }
        out
    }
}

/// Fixed-stride subsampling: every `max(1, len / max_points)`-th bin from 0.
///
/// Bins between samples are dropped, not averaged. Lengths below twice the
/// budget keep a stride of 1, so the result can exceed `max_points`.
pub fn downsample(bins: &[f64], max_points: usize) -> Vec<f64> {
    let stride = (bins.len() / max_points.max(1)).max(1);
    bins.iter().step_by(stride).copied().collect()
}

/// `Centers: <first> Hz .. <last> Hz`, one decimal place.
pub fn centers_line(centers: &[f64]) -> String {
    let fmt = |c: Option<&f64>| c.map_or_else(|| "?".to_string(), |v| format!("{v:.1}"));
    format!(
        "Centers: {} Hz .. {} Hz",
        fmt(centers.first()),
        fmt(centers.last())
    )
}

/// Draw `series` as a line chart `height + 1` rows tall with a labeled
/// y axis. Returns an empty string for an empty series.
pub fn plot(series: &[f64], height: usize) -> String {
    let Some(&first) = series.first() else {
        return String::new();
    };
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Halved so the span stays finite for bins near f64::MAX.
    let half_span = max / 2.0 - min / 2.0;
    let rows = if half_span > 0.0 { height } else { 0 };
    let level = |v: f64| {
        if rows == 0 {
            return 0;
        }
        let t = (v / 2.0 - min / 2.0) / half_span;
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        ((t * rows as f64).round() as usize).min(rows)
    };

    let width = series.len() - 1;
    let mut canvas = vec![vec![' '; width]; rows + 1];
    let mut axis = vec!['┤'; rows + 1];
    axis[rows - level(first)] = '┼';

    for (x, pair) in series.windows(2).enumerate() {
        let (a, b) = (level(pair[0]), level(pair[1]));
        if a == b {
            canvas[rows - a][x] = '─';
            continue;
        }
        canvas[rows - b][x] = if a > b { '╰' } else { '╭' };
        canvas[rows - a][x] = if a > b { '╮' } else { '╯' };
        for y in a.min(b) + 1..a.max(b) {
            canvas[rows - y][x] = '│';
        }
    }

    let mut lines = Vec::with_capacity(rows + 1);
    for (r, cells) in canvas.iter().enumerate() {
        let label = if rows > 0 {
            let f = r as f64 / rows as f64;
            max * (1.0 - f) + min * f
        } else {
            max
        };
        let body: String = cells.iter().collect();
        let line = format!("{label:>10.2} {}{body}", axis[r]);
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}
