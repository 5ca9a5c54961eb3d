use num::Num;
use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::SparseVec;

impl<N> Serialize for SparseVec<N>
where
    N: Num + Serialize + Copy,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // シリアライズするフィールドは len, entries とする
        let mut state = serializer.serialize_struct("SparseVec", 2)?;
        state.serialize_field("len", &(self.len() as u64))?;
        // entries: (index, value) のVecとして順序付きに出力する
        let entries: Vec<(u64, N)> = self.raw_iter().map(|(idx, val)| (idx as u64, val)).collect();
        state.serialize_field("entries", &entries)?;
        state.end()
    }
}

impl<'de, N> Deserialize<'de> for SparseVec<N>
where
    N: Num + Deserialize<'de> + Copy,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // 内部表現用の一時構造体
        #[derive(Deserialize)]
        struct SparseVecData<N> {
            len: u64,
            entries: Vec<(u64, N)>,
        }

        let data = SparseVecData::deserialize(deserializer)?;
        let len = data.len as usize;
        let mut vec = SparseVec::with_capacity(len, data.entries.len());
        let mut prev: Option<u64> = None;
        for (index, value) in data.entries {
            if index >= data.len || prev.is_some_and(|p| p >= index) {
                return Err(DeError::custom("SparseVec deserialize error: entries out of order or out of range"));
            }
            prev = Some(index);
            vec.push_entry(index as usize, value);
        }
        Ok(vec)
    }
}
