//! Cassette data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Port name under which feed traffic is recorded.
pub const FEED_PORT: &str = "feed";

/// A single recorded interaction with an external port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name, currently always [`FEED_PORT`].
    pub port: String,
    /// Method name: a `TaskFeed` operation or `snapshot` for pushes.
    pub method: String,
    /// Input data sent to the port.
    pub input: serde_json::Value,
    /// Output data returned from the port.
    pub output: serde_json::Value,
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Where the traffic came from, e.g. the feed base URL.
    pub source: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_keeps_interaction_order() {
        let cassette = Cassette {
            name: "session".into(),
            recorded_at: Utc::now(),
            source: "http://localhost:8080".into(),
            interactions: vec![
                Interaction {
                    seq: 0,
                    port: FEED_PORT.into(),
                    method: "subscribe".into(),
                    input: json!({"ownerId": "alice"}),
                    output: json!({"Ok": null}),
                },
                Interaction {
                    seq: 1,
                    port: FEED_PORT.into(),
                    method: "snapshot".into(),
                    input: json!({"ownerId": "alice"}),
                    output: json!({"Ok": []}),
                },
            ],
        };
        let yaml = serde_yaml::to_string(&cassette).expect("serialize");
        let parsed: Cassette = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(parsed, cassette);
        assert!(yaml.find("subscribe").unwrap() < yaml.find("snapshot").unwrap());
    }
}
