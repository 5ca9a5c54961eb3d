pub mod math;
pub mod serde;

use std::fmt::{self, Debug};

use num::Num;

/// SparseVecは0要素を疎とした疎ベクトルの実装です
/// indices と values を持ち
/// indicesは要素のインデックスを保持し、
/// valuesは要素の値を保持します
///
/// 要素はindicesの昇順でソートされていることを保証します
/// (同じインデックスが二度現れることはありません)
#[derive(Clone, PartialEq)]
pub struct SparseVec<N>
where
    N: Num + Copy,
{
    inds: Vec<usize>,
    vals: Vec<N>,
    len: usize,
}

impl<N> SparseVec<N>
where
    N: Num + Copy,
{
    #[inline]
    pub fn new(len: usize) -> Self {
        SparseVec {
            inds: Vec::new(),
            vals: Vec::new(),
            len,
        }
    }

    #[inline]
    pub fn with_capacity(len: usize, cap: usize) -> Self {
        SparseVec {
            inds: Vec::with_capacity(cap),
            vals: Vec::with_capacity(cap),
            len,
        }
    }

    /// Build from `(index, value)` pairs in any order.
    /// Duplicate indices are summed, zero values are dropped.
    ///
    /// # Arguments
    /// * `len` - logical dimension
    /// * `pairs` - entries
    pub fn from_pairs(len: usize, pairs: impl IntoIterator<Item = (usize, N)>) -> Self {
        let mut pairs: Vec<(usize, N)> = pairs.into_iter().collect();
        pairs.sort_by_key(|(idx, _)| *idx);
        let mut vec = SparseVec::with_capacity(len, pairs.len());
        for (idx, val) in pairs {
            debug_assert!(idx < len, "index {idx} out of bounds for len {len}");
            if vec.inds.last() == Some(&idx) {
                if let Some(slot) = vec.vals.last_mut() {
                    *slot = *slot + val;
                }
            } else {
                vec.inds.push(idx);
                vec.vals.push(val);
            }
        }
        vec.retain(|_, v| v != N::zero());
        vec
    }

    /// 末尾に要素を追加する
    /// indexは既存の最大インデックスより大きい必要がある
    ///
    /// # Arguments
    /// * `index` - 追加する要素のインデックス
    /// * `value` - 追加する要素の値
    #[inline]
    pub fn push_entry(&mut self, index: usize, value: N) {
        debug_assert!(index < self.len, "index out of bounds");
        debug_assert!(
            self.inds.last().map_or(true, |&last| last < index),
            "entries must be pushed in increasing index order"
        );
        if value != N::zero() {
            self.inds.push(index);
            self.vals.push(value);
        }
    }

    #[inline]
    fn ind_binary_search(&self, index: &usize) -> Result<usize, usize> {
        self.inds.binary_search(index)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inds.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.inds
    }

    #[inline]
    pub fn values(&self) -> &[N] {
        &self.vals
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<N> {
        if index >= self.len {
            return None;
        }
        match self.ind_binary_search(&index) {
            Ok(pos) => Some(self.vals[pos]),
            Err(_) => Some(N::zero()),
        }
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.ind_binary_search(&index).is_ok()
    }

    /// 非ゼロ要素だけを (index, value) で走査する
    #[inline]
    pub fn raw_iter(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.inds.iter().copied().zip(self.vals.iter().copied())
    }

    /// apply `f` to every stored value, dropping entries that become zero
    pub fn map_values<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, N) -> N,
    {
        for (idx, val) in self.inds.iter().zip(self.vals.iter_mut()) {
            *val = f(*idx, *val);
        }
        self.retain(|_, v| v != N::zero());
    }

    /// keep only entries for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, N) -> bool,
    {
        let mut write = 0;
        for read in 0..self.inds.len() {
            let (idx, val) = (self.inds[read], self.vals[read]);
            if keep(idx, val) {
                self.inds[write] = idx;
                self.vals[write] = val;
                write += 1;
            }
        }
        self.inds.truncate(write);
        self.vals.truncate(write);
    }

    /// dense copy, mostly for debugging and small tests
    pub fn to_dense(&self) -> Vec<N> {
        let mut dense = vec![N::zero(); self.len];
        for (idx, val) in self.raw_iter() {
            dense[idx] = val;
        }
        dense
    }
}

impl<N> Default for SparseVec<N>
where
    N: Num + Copy,
{
    #[inline]
    fn default() -> Self {
        SparseVec::new(0)
    }
}

impl<N: Num + Copy + Debug> Debug for SparseVec<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("SparseVec")
                .field("len", &self.len)
                .field("nnz", &self.nnz())
                .field("entries", &self.raw_iter().collect::<Vec<_>>())
                .finish()
        } else {
            write!(f, "SparseVec({:?})", self.raw_iter().collect::<Vec<_>>())
        }
    }
}
