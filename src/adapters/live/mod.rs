//! Live adapters for real external interactions.

pub mod clock;
pub mod feed;
pub mod id_gen;
pub mod line_buffer;

pub use clock::LiveClock;
pub use feed::LiveTaskFeed;
pub use id_gen::LiveIdGenerator;
