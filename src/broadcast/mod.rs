//! Line fan-out
//!
//! The [`Broadcaster`] hands each line produced by a tail pass to every
//! subscriber registered for that file. A subscriber whose channel stays
//! full past the configured send timeout loses that line; nobody else
//! waits longer than that timeout on its account.

pub mod fanout;

pub use fanout::{Broadcaster, PublishOutcome};
