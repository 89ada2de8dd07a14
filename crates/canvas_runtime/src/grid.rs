//! Desktop icon placement lattice.
//!
//! The grid exists only for icon collision avoidance: pixel positions stay
//! authoritative for rendering, and cells are claimed or released as icons
//! are placed, dropped, or removed. Claiming a held cell and releasing a
//! free cell are both no-ops so callers can re-apply transitions safely.

use std::collections::HashSet;
use std::rc::Rc;

use board_contract::{GridCell, WindowPosition};
use platform_remote::{ViewportBounds, ViewportProvider};

/// Side length of one lattice cell in pixels.
pub const GRID_CELL_SIZE: i32 = 80;
/// Margin between the canvas edge and the first cell.
pub const GRID_MARGIN: i32 = 20;
/// Rendered icon size in pixels, used to clamp icon drags to the canvas.
pub const ICON_SIZE: i32 = 60;

/// Occupancy tracker for the icon placement lattice.
pub struct GridAllocator {
    occupied: HashSet<GridCell>,
    viewport: Rc<dyn ViewportProvider>,
}

impl GridAllocator {
    /// Creates an empty allocator over the given viewport source.
    pub fn new(viewport: Rc<dyn ViewportProvider>) -> Self {
        Self {
            occupied: HashSet::new(),
            viewport,
        }
    }

    /// Snaps a pixel position to its nearest lattice cell, clamped to the
    /// non-negative quadrant.
    pub fn pixel_to_cell(position: WindowPosition) -> GridCell {
        let snap = |px: i32| {
            (px - GRID_MARGIN + GRID_CELL_SIZE / 2)
                .div_euclid(GRID_CELL_SIZE)
                .max(0)
        };
        GridCell {
            grid_x: snap(position.x),
            grid_y: snap(position.y),
        }
    }

    /// Pixel position of a lattice cell's top-left corner; exact inverse of
    /// [`GridAllocator::pixel_to_cell`] on cell corners.
    pub fn cell_to_pixel(cell: GridCell) -> WindowPosition {
        WindowPosition {
            x: GRID_MARGIN + cell.grid_x * GRID_CELL_SIZE,
            y: GRID_MARGIN + cell.grid_y * GRID_CELL_SIZE,
        }
    }

    /// Current canvas bounds, falling back to the estimated viewport when the
    /// canvas is not measurable.
    pub fn bounds(&self) -> ViewportBounds {
        self.viewport
            .canvas_bounds()
            .unwrap_or(ViewportBounds::ESTIMATED_FALLBACK)
    }

    fn max_columns(&self) -> i32 {
        ((self.bounds().width - GRID_MARGIN * 2) / GRID_CELL_SIZE).max(0)
    }

    fn max_rows(&self) -> i32 {
        ((self.bounds().height - GRID_MARGIN * 2) / GRID_CELL_SIZE).max(0)
    }

    /// Finds the first free cell scanning rows top-to-bottom and columns
    /// left-to-right, claims it, and returns it.
    ///
    /// When every cell inside the viewport-derived bound is taken, returns
    /// the origin cell without claiming: overlapping placement at (0,0) is
    /// the documented degenerate fallback.
    pub fn next_free_cell(&mut self) -> GridCell {
        let columns = self.max_columns();
        let rows = self.max_rows();
        for row in 0..rows {
            for column in 0..columns {
                let cell = GridCell {
                    grid_x: column,
                    grid_y: row,
                };
                if self.occupied.insert(cell) {
                    return cell;
                }
            }
        }
        tracing::warn!(columns, rows, "icon grid exhausted; overlapping at origin");
        GridCell::ORIGIN
    }

    /// Marks a cell occupied. Claiming a held cell is a no-op.
    pub fn claim(&mut self, cell: GridCell) {
        self.occupied.insert(cell);
    }

    /// Frees a cell. Releasing a cell that is not held is a no-op.
    pub fn release(&mut self, cell: GridCell) {
        self.occupied.remove(&cell);
    }

    /// Whether a cell is currently occupied.
    pub fn is_occupied(&self, cell: GridCell) -> bool {
        self.occupied.contains(&cell)
    }

    /// Drops all occupancy, e.g. before a wholesale icon rebuild.
    pub fn clear(&mut self) {
        self.occupied.clear();
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.occupied.len()
    }
}

#[cfg(test)]
mod tests {
    use platform_remote::FixedViewport;
    use pretty_assertions::assert_eq;

    use super::*;

    fn allocator(width: i32, height: i32) -> GridAllocator {
        GridAllocator::new(Rc::new(FixedViewport(ViewportBounds { width, height })))
    }

    #[test]
    fn pixel_snapping_rounds_to_the_nearest_cell() {
        let origin = GridAllocator::cell_to_pixel(GridCell::ORIGIN);
        assert_eq!(origin, WindowPosition { x: 20, y: 20 });
        assert_eq!(GridAllocator::pixel_to_cell(origin), GridCell::ORIGIN);

        // 59 px is still nearest to column 0; 60 px tips over to column 1.
        assert_eq!(
            GridAllocator::pixel_to_cell(WindowPosition { x: 59, y: 20 }),
            GridCell {
                grid_x: 0,
                grid_y: 0,
            }
        );
        assert_eq!(
            GridAllocator::pixel_to_cell(WindowPosition { x: 60, y: 20 }),
            GridCell {
                grid_x: 1,
                grid_y: 0,
            }
        );
    }

    #[test]
    fn negative_pixels_clamp_to_the_origin_cell() {
        assert_eq!(
            GridAllocator::pixel_to_cell(WindowPosition { x: -500, y: -2 }),
            GridCell::ORIGIN
        );
    }

    #[test]
    fn allocation_scans_rows_outer_and_columns_inner() {
        let mut grid = allocator(260, 260);
        // (260 - 40) / 80 = 2 columns and 2 rows.
        let cells: Vec<GridCell> = (0..4).map(|_| grid.next_free_cell()).collect();
        assert_eq!(
            cells,
            vec![
                GridCell {
                    grid_x: 0,
                    grid_y: 0,
                },
                GridCell {
                    grid_x: 1,
                    grid_y: 0,
                },
                GridCell {
                    grid_x: 0,
                    grid_y: 1,
                },
                GridCell {
                    grid_x: 1,
                    grid_y: 1,
                },
            ]
        );
    }

    #[test]
    fn exhausted_grid_falls_back_to_the_origin() {
        let mut grid = allocator(260, 180);
        // Two columns, one row.
        grid.next_free_cell();
        grid.next_free_cell();
        assert_eq!(grid.next_free_cell(), GridCell::ORIGIN);
        assert_eq!(grid.occupied_cells(), 2);
    }

    #[test]
    fn allocation_skips_cells_claimed_from_saved_placements() {
        let mut grid = allocator(500, 500);
        grid.claim(GridCell {
            grid_x: 0,
            grid_y: 0,
        });
        grid.claim(GridCell {
            grid_x: 1,
            grid_y: 0,
        });
        assert_eq!(
            grid.next_free_cell(),
            GridCell {
                grid_x: 2,
                grid_y: 0,
            }
        );
    }

    #[test]
    fn release_and_claim_are_idempotent() {
        let mut grid = allocator(500, 500);
        let cell = GridCell {
            grid_x: 3,
            grid_y: 1,
        };
        grid.release(cell);
        grid.claim(cell);
        grid.claim(cell);
        assert_eq!(grid.occupied_cells(), 1);
        grid.release(cell);
        grid.release(cell);
        assert_eq!(grid.occupied_cells(), 0);
    }

    #[test]
    fn unmeasured_viewports_use_the_estimated_fallback() {
        let grid = GridAllocator::new(Rc::new(platform_remote::UnmeasuredViewport));
        assert_eq!(grid.bounds(), ViewportBounds::ESTIMATED_FALLBACK);
    }
}
