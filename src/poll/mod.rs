//! Poll loop: fetch, filter, notify, record, sleep.

pub mod runner;
pub mod types;

pub use runner::PollLoop;
pub use types::{render_body, CycleReport, LoopSummary, PollSettings, PollState};
