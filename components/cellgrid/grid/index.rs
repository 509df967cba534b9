/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! World-space to cell-space mapping.
//!
//! Positions are normalized against the grid bounds and stepped down to
//! integer cell coordinates. The stepping uses a `count - 1` factor, so the
//! partition is intentionally not uniform: the topmost index on each axis is
//! only reached at the upper bound itself. Changing this to a uniform
//! partition changes which cell any boundary-adjacent entity lands in, so it
//! must stay as is.

use euclid::default::{Box2D, Point2D, Size2D};

/// A clamped cell coordinate, always inside the grid resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellIndex {
    pub x: u32,
    pub y: u32,
}

/// An inclusive rectangle of cell coordinates, at least 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub min: CellIndex,
    pub max: CellIndex,
}

impl CellSpan {
    /// Number of covered columns
    pub fn width(&self) -> u32 {
        self.max.x - self.min.x + 1
    }

    /// Number of covered rows
    pub fn height(&self) -> u32 {
        self.max.y - self.min.y + 1
    }

    /// Total number of covered cells
    pub fn cell_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Whether `cell` lies inside this span
    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Whether two spans share at least one cell
    pub fn intersects(&self, other: &CellSpan) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Iterate the covered cells in row-major order
    pub fn cells(self) -> impl Iterator<Item = CellIndex> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| CellIndex { x, y }))
    }
}

/// Map a world position to the cell containing it. Positions outside the
/// bounds saturate to the boundary cell instead of erroring.
pub fn cell_index(bounds: &Box2D<f32>, cols: u32, rows: u32, position: Point2D<f32>) -> CellIndex {
    CellIndex {
        x: axis_cell(position.x, bounds.min.x, bounds.max.x, cols),
        y: axis_cell(position.y, bounds.min.y, bounds.max.y, rows),
    }
}

/// Cell rectangle covered by a footprint of `extent` centered on `position`.
/// The extent must already be non-negative; a zero extent collapses both
/// corners onto the same cell.
pub fn span_of(
    bounds: &Box2D<f32>,
    cols: u32,
    rows: u32,
    position: Point2D<f32>,
    extent: Size2D<f32>,
) -> CellSpan {
    let half_w = extent.width * 0.5;
    let half_h = extent.height * 0.5;
    let min = cell_index(
        bounds,
        cols,
        rows,
        Point2D::new(position.x - half_w, position.y - half_h),
    );
    let max = cell_index(
        bounds,
        cols,
        rows,
        Point2D::new(position.x + half_w, position.y + half_h),
    );
    CellSpan { min, max }
}

fn axis_cell(coord: f32, min: f32, max: f32, count: u32) -> u32 {
    let width = max - min;
    if width <= 0.0 || count == 0 {
        return 0;
    }
    let normalized = ((coord - min) / width).clamp(0.0, 1.0);
    (normalized * (count - 1) as f32).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds_16() -> Box2D<f32> {
        Box2D::new(Point2D::new(0.0, 0.0), Point2D::new(16.0, 16.0))
    }

    #[test]
    fn test_cell_index_within_range() {
        let bounds = bounds_16();
        for i in -40..80 {
            let p = Point2D::new(i as f32 * 0.5, i as f32 * 0.5);
            let cell = cell_index(&bounds, 16, 16, p);
            assert!(cell.x < 16);
            assert!(cell.y < 16);
        }
    }

    #[test]
    fn test_cell_index_is_deterministic() {
        let bounds = bounds_16();
        let p = Point2D::new(8.2, 3.7);
        assert_eq!(cell_index(&bounds, 16, 16, p), cell_index(&bounds, 16, 16, p));
    }

    #[test]
    fn test_out_of_bounds_saturates() {
        let bounds = bounds_16();
        let low = cell_index(&bounds, 16, 16, Point2D::new(-100.0, -5.0));
        assert_eq!(low, CellIndex { x: 0, y: 0 });
        let high = cell_index(&bounds, 16, 16, Point2D::new(100.0, 20.0));
        assert_eq!(high, CellIndex { x: 15, y: 15 });
    }

    #[test]
    fn test_stepping_uses_count_minus_one() {
        let bounds = bounds_16();
        // normalized 0.5 * 15 = 7.5 -> cell 7, not 8
        assert_eq!(cell_index(&bounds, 16, 16, Point2D::new(8.0, 8.0)).x, 7);
        // normalized (7.5/16) * 15 = 7.03 -> cell 7
        assert_eq!(cell_index(&bounds, 16, 16, Point2D::new(7.5, 0.0)).x, 7);
    }

    #[test]
    fn test_last_cell_only_reached_at_upper_bound() {
        let bounds = bounds_16();
        // Just below the bound still lands one cell short of the top index.
        assert_eq!(cell_index(&bounds, 16, 16, Point2D::new(15.999, 0.0)).x, 14);
        assert_eq!(cell_index(&bounds, 16, 16, Point2D::new(16.0, 0.0)).x, 15);
    }

    #[test]
    fn test_single_cell_axis_maps_to_zero() {
        let bounds = bounds_16();
        for i in 0..40 {
            assert_eq!(cell_index(&bounds, 1, 1, Point2D::new(i as f32, i as f32)), CellIndex {
                x: 0,
                y: 0
            });
        }
    }

    #[test]
    fn test_degenerate_bounds_map_to_zero() {
        let flat = Box2D::new(Point2D::new(4.0, 0.0), Point2D::new(4.0, 16.0));
        let cell = cell_index(&flat, 16, 16, Point2D::new(9.0, 8.0));
        assert_eq!(cell.x, 0);
        assert_eq!(cell.y, 7);
    }

    #[test]
    fn test_span_of_point_footprint_is_one_cell() {
        let bounds = bounds_16();
        let span = span_of(&bounds, 16, 16, Point2D::new(8.0, 8.0), Size2D::new(0.0, 0.0));
        assert_eq!(span.min, span.max);
        assert_eq!(span.cell_count(), 1);
    }

    #[test]
    fn test_span_of_wide_footprint_covers_block() {
        let bounds = bounds_16();
        let span = span_of(&bounds, 16, 16, Point2D::new(8.0, 8.0), Size2D::new(3.0, 3.0));
        assert_eq!(span.min, CellIndex { x: 6, y: 6 });
        assert_eq!(span.max, CellIndex { x: 8, y: 8 });
        assert_eq!(span.cell_count(), 9);
    }

    #[test]
    fn test_span_cells_row_major() {
        let span = CellSpan {
            min: CellIndex { x: 1, y: 1 },
            max: CellIndex { x: 2, y: 2 },
        };
        let cells: Vec<CellIndex> = span.cells().collect();
        assert_eq!(cells, vec![
            CellIndex { x: 1, y: 1 },
            CellIndex { x: 2, y: 1 },
            CellIndex { x: 1, y: 2 },
            CellIndex { x: 2, y: 2 },
        ]);
    }

    #[test]
    fn test_span_contains_and_intersects() {
        let a = CellSpan {
            min: CellIndex { x: 2, y: 2 },
            max: CellIndex { x: 4, y: 4 },
        };
        assert!(a.contains(CellIndex { x: 3, y: 2 }));
        assert!(!a.contains(CellIndex { x: 5, y: 2 }));

        let b = CellSpan {
            min: CellIndex { x: 4, y: 4 },
            max: CellIndex { x: 6, y: 6 },
        };
        let c = CellSpan {
            min: CellIndex { x: 5, y: 0 },
            max: CellIndex { x: 6, y: 3 },
        };
        assert!(a.intersects(&b)); // share the corner cell (4,4)
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }
}
