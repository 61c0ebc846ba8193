//! Replays recorded interactions from a cassette.

use std::collections::HashMap;
use std::path::Path;

use super::format::{Cassette, Interaction};
use super::CassetteError;

/// Key for indexing interactions by port and method.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct PortMethodKey {
    port: String,
    method: String,
}

impl PortMethodKey {
    fn new(port: &str, method: &str) -> Self {
        Self { port: port.to_string(), method: method.to_string() }
    }
}

/// Replays interactions from a loaded cassette, serving them sequentially
/// per port/method pair.
#[derive(Debug)]
pub struct CassetteReplayer {
    /// Per port+method queue of interactions (in order).
    queues: HashMap<PortMethodKey, Vec<Interaction>>,
    /// Per port+method cursor tracking position.
    cursors: HashMap<PortMethodKey, usize>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<PortMethodKey, Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = PortMethodKey::new(&interaction.port, &interaction.method);
            queues.entry(key).or_default().push(interaction.clone());
        }
        let cursors = queues.keys().map(|k| (k.clone(), 0)).collect();
        Self { queues, cursors }
    }

    /// Reads and parses the cassette at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CassetteError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| CassetteError::Io { path: path.to_path_buf(), source })?;
        let cassette: Cassette = serde_yaml::from_str(&content)
            .map_err(|source| CassetteError::Parse { path: path.to_path_buf(), source })?;
        Ok(Self::new(&cassette))
    }

    /// The next unconsumed interaction for `port`/`method`, without
    /// consuming it.
    #[must_use]
    pub fn peek(&self, port: &str, method: &str) -> Option<&Interaction> {
        let key = PortMethodKey::new(port, method);
        let cursor = *self.cursors.get(&key)?;
        self.queues.get(&key)?.get(cursor)
    }

    /// Consumes and returns the next interaction for `port`/`method`.
    ///
    /// Returns `None` once the cassette holds no more interactions for the
    /// pair; the miss is logged with what was still available.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Option<&Interaction> {
        let key = PortMethodKey::new(port, method);
        let Some(cursor) = self.cursors.get_mut(&key) else {
            let available: Vec<String> =
                self.queues.keys().map(|k| format!("{}::{}", k.port, k.method)).collect();
            tracing::warn!(
                port,
                method,
                available = %available.join(", "),
                "cassette has no interactions for this call"
            );
            return None;
        };
        let queue = self.queues.get(&key)?;
        let Some(interaction) = queue.get(*cursor) else {
            tracing::warn!(port, method, count = queue.len(), "cassette exhausted");
            return None;
        };
        *cursor += 1;
        Some(interaction)
    }

    /// Smallest sequence number still pending on any stream other than
    /// `port`/`method`.
    #[must_use]
    pub fn next_seq_excluding(&self, port: &str, method: &str) -> Option<u64> {
        let excluded = PortMethodKey::new(port, method);
        self.queues
            .iter()
            .filter(|(key, _)| **key != excluded)
            .filter_map(|(key, queue)| queue.get(*self.cursors.get(key)?))
            .map(|interaction| interaction.seq)
            .min()
    }
}
