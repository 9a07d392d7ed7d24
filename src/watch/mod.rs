//! Directory watching
//!
//! The [`ChangeDetector`] turns a startup scan and filesystem write events
//! into tail passes. The [`PassScheduler`] makes sure passes over the same
//! file never overlap, coalescing bursts of events into follow-up passes.

pub mod detector;
pub mod filter;
pub mod scheduler;

pub use detector::{ChangeDetector, WatchHandle};
pub use filter::LogFilter;
pub use scheduler::PassScheduler;
