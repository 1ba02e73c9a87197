// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Spatial-hash broad phase.
//!
//! Bodies whose bounding radius fits inside one grid cell are placed in
//! exactly one cell keyed by
//! `(⌊x/cell⌋ & 0xFFFF) << 16 | (⌊y/cell⌋ & 0xFFFF)`. Larger bodies go to an
//! oversized list that pairs against every regular body plus each other.
//!
//! Pair uniqueness is structural: cells are visited in ascending key order,
//! in-cell members pair `i < j`, and cross-cell pairing is restricted to the
//! right, below-left, below, and below-right neighbours — every unordered
//! neighbour relation is covered by exactly one side. Oversized pairing is
//! key-ordered over slots. No deduplication set exists, because iterating
//! one would itself be a determinism hazard.

use std::collections::BTreeMap;

use crate::math::{Fx, Vec2};

/// Cell population for one step.
#[derive(Debug, Default)]
struct Cell {
    cx: i32,
    cy: i32,
    members: Vec<usize>,
}

/// Broad-phase grid. Rebuilt from body positions each step.
#[derive(Debug)]
pub struct SpatialHash {
    cell_size: Fx,
    cells: BTreeMap<u32, Cell>,
    oversized: Vec<usize>,
    regular: Vec<usize>,
}

fn pack_key(cx: i32, cy: i32) -> u32 {
    ((cx as u32 & 0xFFFF) << 16) | (cy as u32 & 0xFFFF)
}

impl SpatialHash {
    /// Creates a grid with the given cell size in world units.
    #[must_use]
    pub fn new(cell_size: Fx) -> Self {
        Self {
            cell_size,
            cells: BTreeMap::new(),
            oversized: Vec::new(),
            regular: Vec::new(),
        }
    }

    /// Cell size in world units.
    #[must_use]
    pub fn cell_size(&self) -> Fx {
        self.cell_size
    }

    /// Rebuilds the grid from `(position, bounding_radius)` per body slot.
    ///
    /// Slot order is the caller's label-sorted body order; everything the
    /// grid emits derives from it deterministically.
    pub fn rebuild(&mut self, bodies: &[(Vec2, Fx)]) {
        self.cells.clear();
        self.oversized.clear();
        self.regular.clear();

        for (slot, &(position, radius)) in bodies.iter().enumerate() {
            if radius > self.cell_size {
                self.oversized.push(slot);
                continue;
            }
            self.regular.push(slot);
            let cx = div_floor(position.x, self.cell_size);
            let cy = div_floor(position.y, self.cell_size);
            let cell = self.cells.entry(pack_key(cx, cy)).or_insert_with(|| Cell {
                cx,
                cy,
                members: Vec::new(),
            });
            cell.members.push(slot);
        }
    }

    /// Emits every candidate pair exactly once, in grid order.
    pub fn pairs(&self, out: &mut Vec<(usize, usize)>) {
        out.clear();

        // Offsets covering each unordered neighbour relation from one side:
        // right, below-left, below, below-right.
        const NEIGHBOURS: [(i32, i32); 4] = [(1, 0), (-1, 1), (0, 1), (1, 1)];

        for (&key, cell) in &self.cells {
            for (i, &a) in cell.members.iter().enumerate() {
                for &b in &cell.members[i + 1..] {
                    out.push((a, b));
                }
            }
            for (dx, dy) in NEIGHBOURS {
                let nkey = pack_key(cell.cx + dx, cell.cy + dy);
                if nkey == key {
                    continue;
                }
                if let Some(neighbour) = self.cells.get(&nkey) {
                    for &a in &cell.members {
                        for &b in &neighbour.members {
                            out.push((a.min(b), a.max(b)));
                        }
                    }
                }
            }
        }

        // Oversized bodies pair against every regular body, then each other,
        // in slot (label) order.
        for &big in &self.oversized {
            for &small in &self.regular {
                out.push((small.min(big), small.max(big)));
            }
        }
        for (i, &a) in self.oversized.iter().enumerate() {
            for &b in &self.oversized[i + 1..] {
                out.push((a, b));
            }
        }
    }
}

/// Floor division of two Q16.16 values to an integer cell coordinate.
fn div_floor(value: Fx, cell: Fx) -> i32 {
    value.raw().div_euclid(cell.raw())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn fx(v: f64) -> Fx {
        Fx::from_num(v)
    }

    fn grid_with(positions: &[(f64, f64)], radius: f64) -> Vec<(usize, usize)> {
        let mut grid = SpatialHash::new(Fx::from_int(64));
        let bodies: Vec<(Vec2, Fx)> = positions
            .iter()
            .map(|&(x, y)| (Vec2::new(fx(x), fx(y)), fx(radius)))
            .collect();
        grid.rebuild(&bodies);
        let mut pairs = Vec::new();
        grid.pairs(&mut pairs);
        pairs
    }

    #[test]
    fn bodies_in_one_cell_pair_once() {
        let pairs = grid_with(&[(1.0, 1.0), (2.0, 2.0)], 1.0);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn neighbour_cells_pair_once() {
        // One body per cell, horizontally adjacent.
        let pairs = grid_with(&[(10.0, 10.0), (70.0, 10.0)], 1.0);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn diagonal_cells_pair_once() {
        let pairs = grid_with(&[(10.0, 10.0), (70.0, 70.0)], 1.0);
        assert_eq!(pairs, vec![(0, 1)]);
        let pairs = grid_with(&[(70.0, 10.0), (10.0, 70.0)], 1.0);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn distant_cells_do_not_pair() {
        let pairs = grid_with(&[(10.0, 10.0), (500.0, 500.0)], 1.0);
        assert!(pairs.is_empty());
    }

    #[test]
    fn every_pair_is_unique_on_a_cluster() {
        // 4x4 cluster straddling several cells; no pair may repeat.
        let mut positions = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                positions.push((f64::from(i) * 40.0, f64::from(j) * 40.0));
            }
        }
        let pairs = grid_with(&positions, 1.0);
        let mut seen = std::collections::BTreeSet::new();
        for &(a, b) in &pairs {
            assert!(a < b, "pairs are emitted in slot order");
            assert!(seen.insert((a, b)), "duplicate pair ({a}, {b})");
        }
    }

    #[test]
    fn oversized_bodies_pair_against_everything() {
        let mut grid = SpatialHash::new(Fx::from_int(64));
        let bodies = vec![
            (Vec2::ZERO, fx(500.0)),                        // oversized
            (Vec2::new(fx(10.0), fx(10.0)), fx(1.0)),       // regular
            (Vec2::new(fx(1000.0), fx(1000.0)), fx(1.0)),   // regular, far away
            (Vec2::new(fx(-900.0), fx(300.0)), fx(200.0)),  // oversized
        ];
        grid.rebuild(&bodies);
        let mut pairs = Vec::new();
        grid.pairs(&mut pairs);
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(0, 2)));
        assert!(pairs.contains(&(1, 3)));
        assert!(pairs.contains(&(2, 3)));
        assert!(pairs.contains(&(0, 3)), "oversized pair each other");
        let mut seen = std::collections::BTreeSet::new();
        for &p in &pairs {
            assert!(seen.insert(p), "duplicate pair {p:?}");
        }
    }
}
