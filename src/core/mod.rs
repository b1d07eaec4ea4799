// Feed state machine exports
pub mod feed;
pub mod merge;

pub use feed::{FeedError, FeedMachine, FeedOptions};
