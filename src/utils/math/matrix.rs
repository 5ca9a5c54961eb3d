use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::vector::SparseVec;

/// Square matrix stored as one sparse row per dimension.
/// Used for term-by-term similarity, where rows are indexed by shared vocabulary id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSparseMatrix {
    dim: usize,
    rows: Vec<SparseVec<f32>>,
}

impl RowSparseMatrix {
    /// identity matrix of the given dimension
    pub fn identity(dim: usize) -> Self {
        let rows = (0..dim)
            .map(|i| SparseVec::from_pairs(dim, [(i, 1.0_f32)]))
            .collect();
        Self { dim, rows }
    }

    /// Build from rows; every row must have dimension `dim`.
    pub fn from_rows(dim: usize, rows: Vec<SparseVec<f32>>) -> Self {
        debug_assert_eq!(rows.len(), dim);
        debug_assert!(rows.iter().all(|r| r.len() == dim));
        Self { dim, rows }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn row(&self, i: usize) -> &SparseVec<f32> {
        &self.rows[i]
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.rows
            .get(i)
            .and_then(|row| row.get(j))
            .unwrap_or(0.0)
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(|r| r.nnz()).sum()
    }

    /// `xᵀ · M` as a sparse row vector
    ///
    /// # Arguments
    /// * `x` - sparse vector of dimension `dim`
    pub fn left_mul(&self, x: &SparseVec<f64>) -> SparseVec<f64> {
        debug_assert_eq!(x.len(), self.dim);
        let mut acc: HashMap<usize, f64> = HashMap::new();
        for (i, xi) in x.raw_iter() {
            for (j, mij) in self.rows[i].raw_iter() {
                *acc.entry(j).or_insert(0.0) += xi * f64::from(mij);
            }
        }
        SparseVec::from_pairs(self.dim, acc)
    }

    /// quadratic form `xᵀ · M · y`
    pub fn inner(&self, x: &SparseVec<f64>, y: &SparseVec<f64>) -> f64 {
        self.left_mul(x).dot(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_quadratic_form_is_dot_product() {
        let m = RowSparseMatrix::identity(4);
        let x = SparseVec::from_pairs(4, vec![(0, 1.0), (2, 2.0)]);
        let y = SparseVec::from_pairs(4, vec![(2, 3.0), (3, 1.0)]);
        assert_eq!(m.inner(&x, &y), 6.0);
        assert_eq!(m.nnz(), 4);
    }

    #[test]
    fn left_mul_mixes_related_rows() {
        let rows = vec![
            SparseVec::from_pairs(2, vec![(0, 1.0), (1, 0.5)]),
            SparseVec::from_pairs(2, vec![(0, 0.5), (1, 1.0)]),
        ];
        let m = RowSparseMatrix::from_rows(2, rows);
        let x = SparseVec::from_pairs(2, vec![(0, 1.0)]);
        let y = SparseVec::from_pairs(2, vec![(1, 1.0)]);
        assert_eq!(m.left_mul(&x).to_dense(), vec![1.0, 0.5]);
        assert_eq!(m.inner(&x, &y), 0.5);
        assert_eq!(m.get(1, 0), 0.5);
    }
}
