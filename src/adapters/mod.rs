//! Port implementations.
//!
//! - `live`: real clock, uuid ids, HTTP document feed.
//! - `polling`: turns one-shot queries into a subscription.
//! - `memory`: process-local identity session and feed for tests and demos.
//! - `recording` / `replaying`: cassette capture and playback of feed traffic.

pub mod live;
pub mod memory;
pub mod polling;
pub mod recording;
pub mod replaying;
