//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the task store and an external
//! system (time, identifiers, the identity provider, the remote document
//! feed). Implementations live in `src/adapters/`.

pub mod clock;
pub mod feed;
pub mod id_gen;
pub mod identity;

pub use clock::Clock;
pub use feed::{FeedFuture, FeedSubscription, SnapshotSink, TaskFeed};
pub use id_gen::IdGenerator;
pub use identity::{AuthFuture, Identity, IdentityListener, IdentitySession, IdentitySubscription};
