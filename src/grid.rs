//! Viewport-windowed result grid model
//!
//! `GridState` holds a fully materialized result matrix plus a movable
//! offset cursor, and exposes only the window the terminal can display.
//! The rendered window is memoized against a monotonically increasing
//! version stamp: every mutation bumps the version, so a cached slice is
//! never served stale and an unchanged grid costs nothing to re-render.

/// A 2D extent or position: `x` counts columns, `y` counts rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub x: usize,
    pub y: usize,
}

impl Extent {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// One cell of the computed window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCell {
    pub text: String,
    /// This is the synthetic header row
    pub header: bool,
    /// This is the cell under the offset cursor
    pub selected: bool,
}

/// The memoized, display-ready slice of the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridWindow {
    /// No result set loaded
    Empty,
    /// Visible slice: header row first, then data rows
    Table {
        /// Top-left of the window in matrix coordinates
        start: Extent,
        rows: Vec<Vec<WindowCell>>,
    },
}

/// Scrollable viewport over a result matrix
pub struct GridState {
    data: Option<Vec<Vec<String>>>,
    header: Vec<String>,
    /// Full matrix extent (columns, rows)
    total: Extent,
    /// Visible window extent, derived from the terminal size
    viewport: Extent,
    /// Logical cursor into the full matrix, clamped to `[0, total - 1]`
    offset: Extent,
    version: u64,
    cache: (u64, GridWindow),
}

impl GridState {
    pub fn new() -> Self {
        Self {
            data: None,
            header: Vec::new(),
            total: Extent::default(),
            viewport: Extent::new(4, 7),
            offset: Extent::default(),
            version: 0,
            cache: (0, GridWindow::Empty),
        }
    }

    pub fn offset(&self) -> Extent {
        self.offset
    }

    pub fn total(&self) -> Extent {
        self.total
    }

    pub fn viewport(&self) -> Extent {
        self.viewport
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Replace the whole result set. The offset snaps back to the origin.
    pub fn reset(
        &mut self,
        data: Vec<Vec<String>>,
        header: Vec<String>,
        viewport: Extent,
        total: Extent,
    ) {
        self.data = Some(data);
        self.header = header;
        self.viewport = viewport;
        self.total = total;
        self.offset = Extent::default();
        self.version += 1;
    }

    /// Drop the result set, returning to the "no data" placeholder
    pub fn clear(&mut self) {
        self.data = None;
        self.header.clear();
        self.total = Extent::default();
        self.offset = Extent::default();
        self.version += 1;
    }

    /// Adopt a new viewport size (terminal resized). No-op when unchanged.
    pub fn set_viewport(&mut self, viewport: Extent) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.version += 1;
        }
    }

    /// Move the offset cursor, clamping each axis independently to
    /// `[0, total - 1]`. Out-of-range requests are never an error.
    pub fn move_offset(&mut self, dx: isize, dy: isize) {
        self.offset.x = clamp_axis(self.offset.x, dx, self.total.x);
        self.offset.y = clamp_axis(self.offset.y, dy, self.total.y);
        self.version += 1;
    }

    /// The visible window, recomputed only when the version changed since
    /// the last call.
    ///
    /// Window start per axis is `clamp(offset - viewport/2, 0,
    /// total - viewport)`, keeping the offset cell centered until the
    /// window hits a matrix edge. The header is prepended as a synthetic
    /// first row; the offset cell is marked selected in window-local
    /// coordinates.
    pub fn window(&mut self) -> &GridWindow {
        if self.cache.0 != self.version {
            self.cache = (self.version, self.compute_window());
        }
        &self.cache.1
    }

    fn compute_window(&self) -> GridWindow {
        let Some(data) = &self.data else {
            return GridWindow::Empty;
        };

        let start = Extent::new(
            window_start(self.offset.x, self.viewport.x, self.total.x),
            window_start(self.offset.y, self.viewport.y, self.total.y),
        );

        let col_range = start.x..(start.x + self.viewport.x).min(self.total.x);
        let mut rows = Vec::with_capacity(self.viewport.y + 1);

        let header_row: Vec<WindowCell> = col_range
            .clone()
            .map(|x| WindowCell {
                text: self.header.get(x).cloned().unwrap_or_default(),
                header: true,
                selected: false,
            })
            .collect();
        rows.push(header_row);

        for y in start.y..(start.y + self.viewport.y).min(self.total.y) {
            let row = col_range
                .clone()
                .map(|x| WindowCell {
                    text: data
                        .get(y)
                        .and_then(|r| r.get(x))
                        .cloned()
                        .unwrap_or_default(),
                    header: false,
                    selected: x == self.offset.x && y == self.offset.y,
                })
                .collect();
            rows.push(row);
        }

        GridWindow::Table { start, rows }
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}

/// Window start on one axis: center the offset, clamped to matrix bounds.
/// A viewport larger than the matrix collapses the start to 0.
fn window_start(offset: usize, viewport: usize, total: usize) -> usize {
    let centered = offset.saturating_sub(viewport / 2);
    centered.min(total.saturating_sub(viewport))
}

fn clamp_axis(value: usize, delta: isize, total: usize) -> usize {
    let max = total.saturating_sub(1) as isize;
    (value as isize + delta).clamp(0, max) as usize
}
