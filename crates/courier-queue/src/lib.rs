//! Keyed task lanes.
//!
//! A [`Lane`] runs asynchronous tasks one at a time, in submission order,
//! pausing for a fixed delay after each one. The [`LaneRegistry`] hands
//! out one lane per string key, creating it on first use:
//!
//! - tasks sharing a key never overlap and complete in FIFO order;
//! - tasks on different keys are independent;
//! - a failing or panicking task is reported to its submitter as a
//!   [`TaskError`] and never stops the lane.

pub mod error;
pub mod lane;
pub mod registry;

pub use error::TaskError;
pub use lane::{Lane, LaneTicket};
pub use registry::{LaneRegistry, DEFAULT_LANE_DELAY};
