use std::collections::HashMap;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::utils::math::matrix::RowSparseMatrix;
use crate::utils::speed::SpeedLogs;
use crate::utils::store::{read_cached, write_compressed};
use crate::vectorizer::context::SharedContext;

use super::{build_term_similarity_matrix, TermSimilarityIndex, TermSimilarityParams};

/// Exclusive advisory lock on a file next to a store entry.
///
/// The operating system releases the lock when the handle is closed or the
/// holding process dies, so a killed builder never blocks later runs. The
/// file itself stays on disk; only the lock on it matters.
struct BuildLock {
    _file: File,
}

impl BuildLock {
    /// Take the lock, waiting for a builder in another process if needed.
    fn acquire(path: &Path, key: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                info!("Waiting for another process to build term similarity matrix {}.", key);
                file.lock().map_err(|e| Error::io(path, e))?;
            }
            Err(TryLockError::Error(e)) => return Err(Error::io(path, e)),
        }
        // holder pid, for whoever looks at a lock held for a long time
        file.set_len(0).map_err(|e| Error::io(path, e))?;
        write!(file, "{}", process::id()).map_err(|e| Error::io(path, e))?;
        Ok(Self { _file: file })
    }
}

/// Persistent store of term similarity matrices keyed by their parameters.
///
/// A matrix for a given key is built at most once: concurrent requests in this
/// process wait on a per-key mutex, and other processes sharing the directory
/// wait on an advisory lock next to the entry until the builder has written it.
/// An unreadable entry counts as missing and is rebuilt.
#[derive(Debug)]
pub struct TermSimilarityCache {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    builds: AtomicU64,
}

impl TermSimilarityCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
            builds: AtomicU64::new(0),
        }
    }

    /// store location of a key
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("termsim-{key}.cbor.gz"))
    }

    /// number of matrices this instance has built (not loaded)
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Load the matrix stored under `key`, or build and store it.
    ///
    /// # Arguments
    /// * `key` - store key, see [`TermSimilarityParams::cache_key`]
    /// * `build` - called only if no entry exists and no one else is building it
    pub fn get_or_build<F>(&self, key: &str, build: F) -> Result<RowSparseMatrix>
    where
        F: FnOnce() -> Result<RowSparseMatrix>,
    {
        let key_lock = self.key_lock(key);
        let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.path(key);
        if let Some(matrix) = read_cached::<RowSparseMatrix>(&path) {
            debug!("Loaded term similarity matrix {}.", key);
            return Ok(matrix);
        }

        let _lock = BuildLock::acquire(&path.with_extension("lock"), key)?;
        // the previous holder may have stored the entry while we waited
        if let Some(matrix) = read_cached::<RowSparseMatrix>(&path) {
            debug!("Loaded term similarity matrix {} built by another process.", key);
            return Ok(matrix);
        }
        info!("Building term similarity matrix {}.", key);
        let matrix = build()?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        write_compressed(&path, &matrix)?;
        Ok(matrix)
    }

    /// Term similarity matrix for the shared vocabulary at a quantization level.
    ///
    /// # Arguments
    /// * `context` - shared vocabulary, TF-IDF model and embeddings
    /// * `num_bits` - quantization level of the embeddings
    /// * `params` - matrix parameters
    /// * `speed_logs` - receives the load/build time
    pub fn matrix(
        &self,
        context: &SharedContext,
        num_bits: u32,
        params: &TermSimilarityParams,
        speed_logs: &mut SpeedLogs,
    ) -> Result<RowSparseMatrix> {
        let key = params.cache_key(num_bits);
        speed_logs.measure(
            |s| format!("Loaded term similarity matrix {key} in {s:.3}s."),
            |_| {
                self.get_or_build(&key, || {
                    let embeddings = context.embedding(num_bits)?;
                    let index = TermSimilarityIndex::new(embeddings, params.threshold, params.exponent);
                    let tfidf = params.tfidf.then_some(&context.tfidf);
                    Ok(build_term_similarity_matrix(
                        &index,
                        context.vocabulary.len(),
                        tfidf,
                        params,
                    ))
                })
            },
        )
    }
}
