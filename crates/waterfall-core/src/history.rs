//! Bounded, oldest-first history of captured rows.

use std::collections::VecDeque;

use crate::frame::BinRow;

/// Default number of rows kept on screen.
pub const DEFAULT_MAX_ROWS: usize = 200;

/// One matrix cell: bin index `x`, row index `y` (0 = oldest), magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

/// Fixed-capacity FIFO of [`BinRow`]s, the state of record for one waterfall.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    rows: VecDeque<BinRow>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROWS)
    }
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a row, evicting from the front until the capacity holds.
    pub fn push(&mut self, row: BinRow) {
        self.rows.push_back(row);
        while self.rows.len() > self.capacity {
            self.rows.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bin count of the most recently pushed row, 0 when empty.
    pub fn current_width(&self) -> usize {
        self.rows.back().map_or(0, BinRow::width)
    }

    /// Rows, oldest first.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &BinRow> {
        self.rows.iter()
    }

    pub fn row(&self, y: usize) -> Option<&BinRow> {
        self.rows.get(y)
    }

    /// One cell per (row, bin) over the current width, oldest row first.
    pub fn to_cells(&self) -> Vec<Cell> {
        let width = self.current_width();
        let mut cells = Vec::with_capacity(width * self.rows.len());
        for (y, row) in self.rows.iter().enumerate() {
            for x in 0..width {
                cells.push(Cell {
                    x,
                    y,
                    value: row.get(x),
                });
            }
        }
        cells
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: &[f64]) -> BinRow {
        BinRow::new(v.to_vec())
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut buf = HistoryBuffer::new(4);
        for i in 0..50 {
            buf.push(row(&[i as f64]));
            assert!(buf.len() <= 4);
        }
    }

    #[test]
    fn keeps_last_rows_in_order() {
        for k in 0..6 {
            let cap = 5;
            let mut buf = HistoryBuffer::new(cap);
            for i in 0..cap + k {
                buf.push(row(&[i as f64]));
            }
            let kept: Vec<f64> = buf.rows().map(|r| r.get(0)).collect();
            let expected: Vec<f64> = (k..cap + k).map(|i| i as f64).collect();
            assert_eq!(kept, expected);
        }
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buf = HistoryBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(row(&[1.0]));
        buf.push(row(&[2.0]));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.row(0).unwrap().get(0), 2.0);
    }

    #[test]
    fn cells_cover_every_row_and_bin() {
        let mut buf = HistoryBuffer::new(3);
        buf.push(row(&[1.0, 0.0, 0.0]));
        buf.push(row(&[0.0, 5.0, 0.0]));
        buf.push(row(&[0.0, 0.0, 10.0]));

        assert_eq!(buf.current_width(), 3);
        let cells = buf.to_cells();
        assert_eq!(cells.len(), 9);
        let corner = cells.iter().find(|c| c.x == 2 && c.y == 2).unwrap();
        assert_eq!(corner.value, 10.0);
        let first = cells.iter().find(|c| c.x == 0 && c.y == 0).unwrap();
        assert_eq!(first.value, 1.0);
    }

    #[test]
    fn ragged_rows_pad_with_zero() {
        let mut buf = HistoryBuffer::new(8);
        buf.push(row(&[7.0, 7.0]));
        buf.push(row(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(buf.current_width(), 4);

        let cells = buf.to_cells();
        assert_eq!(cells.len(), 8);
        let padded: Vec<f64> = cells.iter().filter(|c| c.y == 0).map(|c| c.value).collect();
        assert_eq!(padded, vec![7.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    fn wider_old_rows_are_cut_to_current_width() {
        let mut buf = HistoryBuffer::new(8);
        buf.push(row(&[1.0, 2.0, 3.0]));
        buf.push(row(&[9.0]));
        assert_eq!(buf.current_width(), 1);
        assert_eq!(buf.to_cells().len(), 2);
        // The old row keeps its own width.
        assert_eq!(buf.row(0).unwrap().width(), 3);
    }

    #[test]
    fn empty_buffer_has_no_width() {
        let buf = HistoryBuffer::default();
        assert_eq!(buf.capacity(), DEFAULT_MAX_ROWS);
        assert_eq!(buf.current_width(), 0);
        assert!(buf.to_cells().is_empty());
    }
}
