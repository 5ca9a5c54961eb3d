use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Collected timing messages of one evaluation run.
/// Every measured section is also logged at `info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedLogs {
    pub entries: Vec<String>,
}

impl SpeedLogs {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Run `f`, then record `message(seconds)`.
    ///
    /// # Arguments
    /// * `message` - formats the elapsed seconds into a log line
    /// * `f` - measured section
    pub fn measure<T, M, F>(&mut self, message: M, f: F) -> T
    where
        M: FnOnce(f64) -> String,
        F: FnOnce(&mut Self) -> T,
    {
        let start = Instant::now();
        let out = f(self);
        let line = message(start.elapsed().as_secs_f64());
        info!("{}", line);
        self.entries.push(line);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
