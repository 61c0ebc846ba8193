//! ID generator port for producing unique identifiers.

/// Generates unique identifiers.
///
/// Feeds that assign record ids locally (the in-memory feed) draw them from
/// here so tests can predict them.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
