//! Symmetric pairwise storage for target distances, force constants and presence flags.
//!
//! The field is a square of `size() >= entity count` cells. Slot `k` in the embedding owns row
//! and column `k`. All writes go through [`Symmetric::set`], which updates `(i, j)` and `(j, i)`
//! together, so the three matrices are symmetric by construction.

use crate::options::{EmbeddingOptions, SimilarityTransform};
use nalgebra::{DMatrix, Scalar};

#[derive(Debug, Clone, PartialEq)]
struct Symmetric<T: Scalar + Copy> {
    cells: DMatrix<T>,
    fill: T,
}

impl<T: Scalar + Copy> Symmetric<T> {
    fn new(size: usize, fill: T) -> Self {
        Self {
            cells: DMatrix::from_element(size, size, fill),
            fill,
        }
    }

    fn get(&self, i: usize, j: usize) -> T {
        self.cells[(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: T) {
        self.cells[(i, j)] = value;
        self.cells[(j, i)] = value;
    }

    /// A fresh `size x size` matrix holding a copy of the leading `keep x keep` block.
    fn regrown(&self, size: usize, keep: usize) -> Self {
        let mut next = Self::new(size, self.fill);
        let keep = keep.min(self.cells.nrows()).min(size);
        next.cells
            .view_mut((0, 0), (keep, keep))
            .copy_from(&self.cells.view((0, 0), (keep, keep)));
        next
    }

    /// Drops row and column `index`, shifting later ones down; the freed last row and column
    /// take the fill value.
    fn remove(&mut self, index: usize) {
        let size = self.cells.nrows();
        let cells = std::mem::replace(&mut self.cells, DMatrix::from_element(0, 0, self.fill));
        self.cells = cells
            .remove_row(index)
            .remove_column(index)
            .resize(size, size, self.fill);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityField {
    transform: SimilarityTransform,
    weak_force_constant: f64,
    strong_force_constant: f64,
    ideal_distance: Symmetric<f64>,
    force_constant: Symmetric<f64>,
    present: Symmetric<bool>,
}

impl SimilarityField {
    pub fn new(size: usize, options: &EmbeddingOptions) -> Self {
        Self {
            transform: options.transform,
            weak_force_constant: options.weak_force_constant,
            strong_force_constant: options.strong_force_constant,
            ideal_distance: Symmetric::new(size, 0.0),
            force_constant: Symmetric::new(size, options.default_force_constant),
            present: Symmetric::new(size, false),
        }
    }

    pub fn size(&self) -> usize {
        self.ideal_distance.cells.nrows()
    }

    pub fn transform(&self) -> SimilarityTransform {
        self.transform
    }

    /// Target distance for a similarity under this field's transform.
    pub fn distance_from_similarity(&self, similarity: f64) -> f64 {
        self.transform.distance(similarity)
    }

    /// Zero means the pair was never set.
    pub fn ideal_distance(&self, i: usize, j: usize) -> f64 {
        self.ideal_distance.get(i, j)
    }

    pub fn force_constant(&self, i: usize, j: usize) -> f64 {
        self.force_constant.get(i, j)
    }

    pub fn is_present(&self, i: usize, j: usize) -> bool {
        self.present.get(i, j)
    }

    pub fn set_ideal_distance(&mut self, i: usize, j: usize, value: f64) {
        self.ideal_distance.set(i, j, value);
    }

    pub fn set_force_constant(&mut self, i: usize, j: usize, value: f64) {
        self.force_constant.set(i, j, value);
    }

    pub fn set_present(&mut self, i: usize, j: usize) {
        self.present.set(i, j, true);
    }

    /// Anchors `slot` to each of the first `n` slots with the strong force constant.
    pub fn set_strong_force_constant(&mut self, slot: usize, n: usize) {
        for k in 0..n.min(self.size()) {
            self.force_constant.set(slot, k, self.strong_force_constant);
        }
    }

    /// Imputes every off-diagonal pair that was never set: the pair is placed at the distance of
    /// `min_similarity`, held by the weak force constant, and marked present.
    ///
    /// Returns the number of unordered pairs filled.
    pub fn fill_missing_with_minimum(&mut self, min_similarity: f64) -> usize {
        let distance = self.distance_from_similarity(min_similarity);
        let size = self.size();
        let mut filled = 0;
        for i in 0..size {
            for j in (i + 1)..size {
                if self.ideal_distance.get(i, j) == 0.0 {
                    self.ideal_distance.set(i, j, distance);
                    self.force_constant.set(i, j, self.weak_force_constant);
                    self.present.set(i, j, true);
                    filled += 1;
                }
            }
        }
        filled
    }

    /// Doubles the field. Cells with row and column below `entity_count` are carried over; every
    /// other cell starts from its default.
    pub fn expand(&mut self, entity_count: usize) {
        let size = self.size().max(1) * 2;
        self.ideal_distance = self.ideal_distance.regrown(size, entity_count);
        self.force_constant = self.force_constant.regrown(size, entity_count);
        self.present = self.present.regrown(size, entity_count);
        tracing::debug!(size, entity_count, "expanded similarity field");
    }

    /// Removes `slot`, moving every later slot down by one. The field keeps its size.
    pub fn remove(&mut self, slot: usize) {
        self.ideal_distance.remove(slot);
        self.force_constant.remove(slot);
        self.present.remove(slot);
    }

    /// Whether all three matrices equal their own transpose.
    pub fn is_symmetric(&self) -> bool {
        self.ideal_distance.cells == self.ideal_distance.cells.transpose()
            && self.force_constant.cells == self.force_constant.cells.transpose()
            && self.present.cells == self.present.cells.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(size: usize) -> SimilarityField {
        SimilarityField::new(
            size,
            &EmbeddingOptions {
                transform: SimilarityTransform::OneMinus,
                default_force_constant: 500.0,
                weak_force_constant: 800.0,
                strong_force_constant: 50.0,
                ..Default::default()
            },
        )
    }

    #[test]
    fn mutators_write_both_cells() {
        let mut f = field(4);
        f.set_ideal_distance(0, 3, 0.25);
        f.set_force_constant(2, 1, 7.0);
        f.set_present(3, 2);
        assert_eq!(f.ideal_distance(3, 0), 0.25);
        assert_eq!(f.force_constant(1, 2), 7.0);
        assert!(f.is_present(2, 3));
        assert!(f.is_symmetric());
    }

    #[test]
    fn new_field_has_defaults() {
        let f = field(3);
        assert_eq!(f.size(), 3);
        assert_eq!(f.ideal_distance(0, 1), 0.0);
        assert_eq!(f.force_constant(0, 1), 500.0);
        assert!(!f.is_present(0, 1));
    }

    #[test]
    fn strong_constant_covers_the_reference_row() {
        let mut f = field(4);
        f.set_strong_force_constant(1, 3);
        assert_eq!(f.force_constant(1, 0), 50.0);
        assert_eq!(f.force_constant(2, 1), 50.0);
        assert_eq!(f.force_constant(3, 1), 500.0);
        assert!(f.is_symmetric());
    }

    #[test]
    fn missing_pairs_take_the_minimum() {
        let mut f = field(3);
        f.set_ideal_distance(0, 1, 0.1);
        f.set_present(0, 1);
        let filled = f.fill_missing_with_minimum(0.3);
        assert_eq!(filled, 2);
        assert_eq!(f.ideal_distance(0, 1), 0.1);
        assert_eq!(f.force_constant(0, 1), 500.0);
        assert_eq!(f.ideal_distance(1, 2), 1.0 - 0.3);
        assert_eq!(f.force_constant(2, 1), 800.0);
        assert!(f.is_present(2, 0));
        // The diagonal stays unused.
        assert_eq!(f.ideal_distance(1, 1), 0.0);
        assert!(!f.is_present(1, 1));
    }

    #[test]
    fn expand_keeps_live_block_and_resets_the_rest() {
        let mut f = field(4);
        f.set_ideal_distance(0, 1, 0.5);
        f.set_force_constant(0, 1, 3.0);
        f.set_present(0, 1);
        // Slot 3 is beyond the live count of 2 and must not survive.
        f.set_ideal_distance(0, 3, 0.9);
        f.expand(2);
        assert_eq!(f.size(), 8);
        assert_eq!(f.ideal_distance(1, 0), 0.5);
        assert_eq!(f.force_constant(1, 0), 3.0);
        assert!(f.is_present(1, 0));
        assert_eq!(f.ideal_distance(0, 3), 0.0);
        assert_eq!(f.force_constant(7, 6), 500.0);
        assert!(f.is_symmetric());
    }

    #[test]
    fn remove_shifts_later_slots_down() {
        let mut f = field(4);
        f.set_ideal_distance(0, 2, 0.2);
        f.set_ideal_distance(2, 3, 0.3);
        f.set_present(2, 3);
        f.remove(1);
        assert_eq!(f.size(), 4);
        assert_eq!(f.ideal_distance(0, 1), 0.2);
        assert_eq!(f.ideal_distance(1, 2), 0.3);
        assert!(f.is_present(2, 1));
        assert_eq!(f.ideal_distance(2, 3), 0.0);
        assert_eq!(f.force_constant(3, 0), 500.0);
        assert!(f.is_symmetric());
    }
}
