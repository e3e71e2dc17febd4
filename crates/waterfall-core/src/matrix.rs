//! Waterfall matrix: history × color scale → grid of colored cells.
//!
//! The grid is always `width × capacity` so the display height stays put
//! while the buffer is still filling. Rows that hold no data yet are `None`
//! and surfaces leave them unpainted.

use crate::color::{ColorScale, Rgb};
use crate::history::HistoryBuffer;

/// Column count assumed before the first row arrives.
pub const DEFAULT_BINS: usize = 64;

/// Inclusive axis range in cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisExtent {
    pub min: f64,
    pub max: f64,
}

impl AxisExtent {
    /// Extent that centers `n` unit cells on integer coordinates: `[-0.5, n-0.5]`.
    pub fn for_cells(n: usize) -> Self {
        Self {
            min: -0.5,
            max: n as f64 - 0.5,
        }
    }
}

/// Rendered waterfall. Row `y = 0` is the oldest row.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixGrid {
    width: usize,
    height: usize,
    cells: Vec<Option<Rgb>>,
    x_extent: AxisExtent,
    y_extent: AxisExtent,
}

impl MatrixGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Color at `(x, y)`; `None` outside the grid or on an unpopulated row.
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[y * self.width + x]
    }

    /// Row `y` as a slice of `width` cells.
    pub fn row(&self, y: usize) -> &[Option<Rgb>] {
        if y >= self.height {
            return &[];
        }
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    pub fn x_extent(&self) -> AxisExtent {
        self.x_extent
    }

    pub fn y_extent(&self) -> AxisExtent {
        self.y_extent
    }
}

/// Stateful only in its column count and the axis extents derived from it.
#[derive(Debug, Clone)]
pub struct MatrixRenderer {
    width: usize,
    capacity: usize,
    x_extent: AxisExtent,
    y_extent: AxisExtent,
}

impl MatrixRenderer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            width: DEFAULT_BINS,
            capacity,
            x_extent: AxisExtent::for_cells(DEFAULT_BINS),
            y_extent: AxisExtent::for_cells(capacity),
        }
    }

    /// Adopt a new bin count. Returns `true` when it changed and the extents
    /// were re-derived.
    pub fn sync_width(&mut self, bins: usize) -> bool {
        if bins == self.width {
            return false;
        }
        log::debug!("bin count changed {} -> {bins}", self.width);
        self.width = bins;
        self.x_extent = AxisExtent::for_cells(bins);
        true
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn x_extent(&self) -> AxisExtent {
        self.x_extent
    }

    pub fn y_extent(&self) -> AxisExtent {
        self.y_extent
    }

    /// Paint every buffered cell with the scale's current colors.
    ///
    /// Pure with respect to its inputs: the same history and scale always
    /// give the same grid.
    pub fn render(&mut self, history: &HistoryBuffer, scale: &ColorScale) -> MatrixGrid {
        if !history.is_empty() {
            self.sync_width(history.current_width());
        }
        if history.capacity() != self.capacity {
            self.capacity = history.capacity();
            self.y_extent = AxisExtent::for_cells(self.capacity);
        }

        let (width, height) = (self.width, self.capacity);
        let mut cells = vec![None; width * height];
        for cell in history.to_cells() {
            cells[cell.y * width + cell.x] = Some(scale.color_for(cell.value));
        }

        MatrixGrid {
            width,
            height,
            cells,
            x_extent: self.x_extent,
            y_extent: self.y_extent,
        }
    }
}
