use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use indexmap::IndexSet;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::info;

use crate::error::{Error, Result};
use crate::vectorizer::vocab::Vocabulary;

/// Word vectors as read from a word2vec text file.
#[derive(Debug, Clone)]
pub struct KeyedVectors {
    tokens: IndexSet<String>,
    vectors: Array2<f32>,
}

impl KeyedVectors {
    /// # Arguments
    /// * `tokens` - one token per row of `vectors`
    /// * `vectors` - `(tokens.len(), dim)` matrix
    pub fn new(tokens: IndexSet<String>, vectors: Array2<f32>) -> Self {
        debug_assert_eq!(tokens.len(), vectors.nrows());
        Self { tokens, vectors }
    }

    /// Read the word2vec text format: a `count dim` header, then one
    /// `token v1 .. vdim` line per word. Files ending in `.gz` are decompressed.
    pub fn load_word2vec_format(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let kv = Self::read_word2vec_format(BufReader::new(reader), path)?;
        info!(
            "Loaded {} word vectors of dimension {} from {}.",
            kv.len(),
            kv.dim(),
            path.display()
        );
        Ok(kv)
    }

    /// Parse word2vec text from any reader; `origin` is only used in errors.
    pub fn read_word2vec_format<R: BufRead>(reader: R, origin: &Path) -> Result<Self> {
        let malformed = |line: usize, reason: String| Error::MalformedEmbeddings {
            path: origin.to_path_buf(),
            line,
            reason,
        };
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| malformed(1, "missing header".to_string()))?
            .map_err(|e| Error::io(origin, e))?;
        let mut header_fields = header.split_whitespace();
        let mut parse_header = |what: &str| -> Result<usize> {
            header_fields
                .next()
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| malformed(1, format!("bad {what} in header")))
        };
        let count = parse_header("count")?;
        let dim = parse_header("dim")?;

        let mut tokens = IndexSet::with_capacity(count);
        let mut data = Vec::with_capacity(count * dim);
        for (offset, line) in lines.enumerate() {
            let line_no = offset + 2;
            let line = line.map_err(|e| Error::io(origin, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let token = fields
                .next()
                .ok_or_else(|| malformed(line_no, "missing token".to_string()))?;
            let before = data.len();
            for field in fields {
                let value: f32 = field
                    .parse()
                    .map_err(|_| malformed(line_no, format!("bad component {field:?}")))?;
                data.push(value);
            }
            if data.len() - before != dim {
                return Err(malformed(
                    line_no,
                    format!("expected {} components, found {}", dim, data.len() - before),
                ));
            }
            if !tokens.insert(token.to_string()) {
                return Err(malformed(line_no, format!("duplicate token {token:?}")));
            }
        }
        if tokens.len() != count {
            return Err(malformed(
                count + 1,
                format!("header announces {} vectors, found {}", count, tokens.len()),
            ));
        }
        let vectors = Array2::from_shape_vec((tokens.len(), dim), data)
            .map_err(|e| malformed(1, e.to_string()))?;
        Ok(Self { tokens, vectors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn get(&self, token: &str) -> Option<ArrayView1<'_, f32>> {
        self.tokens
            .get_index_of(token)
            .map(|row| self.vectors.row(row))
    }
}

/// Dense embedding table indexed by vocabulary id.
///
/// Rows of terms without a known embedding are exactly zero. The squared L2
/// norm of every row is computed once, for fast pairwise euclidean distances.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    matrix: Array2<f32>,
    norms_squared: Array1<f32>,
}

impl EmbeddingMatrix {
    /// Copy every vocabulary term's vector into the row at its id.
    ///
    /// # Arguments
    /// * `embeddings` - source word vectors
    /// * `vocab` - target id space
    pub fn translate(embeddings: &KeyedVectors, vocab: &Vocabulary) -> Self {
        let mut matrix = Array2::<f32>::zeros((vocab.len(), embeddings.dim()));
        let mut found = 0usize;
        for (id, token) in vocab.tokens().enumerate() {
            if let Some(vector) = embeddings.get(token) {
                matrix.row_mut(id).assign(&vector);
                found += 1;
            }
        }
        info!(
            "Translated embeddings: {} of {} vocabulary terms have vectors.",
            found,
            vocab.len()
        );
        Self::from_matrix(matrix)
    }

    pub fn from_matrix(matrix: Array2<f32>) -> Self {
        let norms_squared = matrix.map_axis(Axis(1), |row| row.dot(&row));
        Self { matrix, norms_squared }
    }

    #[inline]
    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    #[inline]
    pub fn norms_squared(&self) -> &Array1<f32> {
        &self.norms_squared
    }

    /// number of rows (vocabulary size)
    #[inline]
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    #[inline]
    pub fn has_vector(&self, id: usize) -> bool {
        self.norms_squared.get(id).is_some_and(|&n| n > 0.0)
    }

    /// Copy with every nonzero row scaled to unit L2 length; zero rows stay zero.
    pub fn l2_normalized(&self) -> Array2<f32> {
        let mut normalized = self.matrix.clone();
        for (mut row, &norm_sq) in normalized.axis_iter_mut(Axis(0)).zip(self.norms_squared.iter()) {
            if norm_sq > 0.0 {
                row.mapv_inplace(|v| v / norm_sq.sqrt());
            }
        }
        normalized
    }

    /// Pairwise euclidean distances between the given rows,
    /// using `|a|² + |b|² - 2a·b` with the cached squared norms.
    pub fn euclidean_distances(&self, ids: &[usize]) -> Array2<f64> {
        let n = ids.len();
        let mut distances = Array2::<f64>::zeros((n, n));
        for a in 0..n {
            let row_a = self.matrix.row(ids[a]);
            let norm_a = f64::from(self.norms_squared[ids[a]]);
            for b in (a + 1)..n {
                let row_b = self.matrix.row(ids[b]);
                let norm_b = f64::from(self.norms_squared[ids[b]]);
                let dot = f64::from(row_a.dot(&row_b));
                let d = (norm_a + norm_b - 2.0 * dot).max(0.0).sqrt();
                distances[[a, b]] = d;
                distances[[b, a]] = d;
            }
        }
        distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TEXT: &str = "3 2\ncat 1.0 0.0\ndog 0.0 2.0\nfish 3.0 4.0\n";

    fn parse(text: &str) -> Result<KeyedVectors> {
        KeyedVectors::read_word2vec_format(Cursor::new(text), Path::new("test.txt"))
    }

    #[test]
    fn reads_text_format() {
        let kv = parse(TEXT).unwrap();
        assert_eq!(kv.len(), 3);
        assert_eq!(kv.dim(), 2);
        assert_eq!(kv.get("dog").unwrap().to_vec(), vec![0.0, 2.0]);
        assert!(kv.get("bird").is_none());
    }

    #[test]
    fn rejects_wrong_component_count() {
        let err = parse("1 3\ncat 1.0 2.0\n").unwrap_err();
        assert!(matches!(err, Error::MalformedEmbeddings { line: 2, .. }));
    }

    #[test]
    fn rejects_short_file() {
        assert!(matches!(parse("2 1\ncat 1.0\n"), Err(Error::MalformedEmbeddings { .. })));
        assert!(matches!(parse(""), Err(Error::MalformedEmbeddings { line: 1, .. })));
    }

    #[test]
    fn translate_zero_fills_unknown_terms() {
        let kv = parse(TEXT).unwrap();
        let vocab = Vocabulary::from_documents(&[vec!["fish", "owl", "cat"]]);
        let table = EmbeddingMatrix::translate(&kv, &vocab);
        assert_eq!(table.len(), 3);
        let owl = vocab.id("owl").unwrap();
        let fish = vocab.id("fish").unwrap();
        assert!(table.matrix().row(owl).iter().all(|&v| v == 0.0));
        assert!(!table.has_vector(owl));
        assert_eq!(table.norms_squared()[fish], 25.0);
    }

    #[test]
    fn distances_use_cached_norms() {
        let table = EmbeddingMatrix::from_matrix(
            Array2::from_shape_vec((3, 2), vec![0.0, 0.0, 3.0, 4.0, 0.0, 1.0]).unwrap(),
        );
        let d = table.euclidean_distances(&[0, 1, 2]);
        assert_eq!(d[[0, 1]], 5.0);
        assert_eq!(d[[1, 0]], 5.0);
        assert!((d[[1, 2]] - 18.0_f64.sqrt()).abs() < 1e-6);
        assert_eq!(d[[2, 2]], 0.0);
    }

    #[test]
    fn normalized_rows_have_unit_length() {
        let table = EmbeddingMatrix::from_matrix(
            Array2::from_shape_vec((2, 2), vec![3.0, 4.0, 0.0, 0.0]).unwrap(),
        );
        let n = table.l2_normalized();
        assert_eq!(n.row(0).to_vec(), vec![0.6, 0.8]);
        assert_eq!(n.row(1).to_vec(), vec![0.0, 0.0]);
    }
}
