//! In-process adapters.

pub mod clock;
pub mod feed;
pub mod id_gen;
pub mod identity;

pub use clock::ManualClock;
pub use feed::{InMemoryTaskFeed, WriteCall};
pub use id_gen::SequentialIdGenerator;
pub use identity::LocalIdentitySession;
