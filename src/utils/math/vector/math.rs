use std::{cmp::Ordering, ops::AddAssign};

use num::{Float, Num};

use super::SparseVec;

/// Vector norm used for unit normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Norm {
    /// sum of absolute values
    L1,
    /// euclidean length
    L2,
}

impl<N> SparseVec<N>
where
    N: Num + Copy,
{
    /// ドット積を計算するメソッド
    ///
    /// # Arguments
    /// * `other` - 他のベクトル
    ///
    /// # Returns
    /// * `R` - ドット積の結果
    #[inline]
    pub fn dot<R>(&self, other: &Self) -> R
    where
        R: Num + AddAssign,
        N: Into<R>,
    {
        debug_assert_eq!(
            self.len(),
            other.len(),
            "Vectors must be of the same length to compute dot product."
        );

        let mut result = R::zero();
        let (self_inds, self_vals) = (self.indices(), self.values());
        let (other_inds, other_vals) = (other.indices(), other.values());

        let mut i = 0;
        let mut j = 0;
        while i < self_inds.len() && j < other_inds.len() {
            match self_inds[i].cmp(&other_inds[j]) {
                Ordering::Equal => {
                    result += self_vals[i].into() * other_vals[j].into();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        result
    }
}

impl<N> SparseVec<N>
where
    N: Float,
{
    #[inline]
    pub fn l1_norm(&self) -> N {
        self.values().iter().fold(N::zero(), |acc, v| acc + v.abs())
    }

    #[inline]
    pub fn l2_norm(&self) -> N {
        self.values().iter().fold(N::zero(), |acc, &v| acc + v * v).sqrt()
    }

    /// multiply every stored value by `factor`
    #[inline]
    pub fn scale(&mut self, factor: N) {
        self.map_values(|_, v| v * factor);
    }

    /// 単位ベクトル化
    /// A zero vector is returned unchanged.
    pub fn unit(mut self, norm: Norm) -> Self {
        let length = match norm {
            Norm::L1 => self.l1_norm(),
            Norm::L2 => self.l2_norm(),
        };
        if length > N::zero() {
            self.scale(length.recip());
        }
        self
    }
}
