//! Page flips across multiple display pipes.
//!
//! A swap flips every participating pipe to the same framebuffer. Each pipe
//! reports completion on its own through the event channel; the swap is
//! finalized, the client notified and the displaced framebuffer reclaimed,
//! once all of them have reported back.

#![allow(clippy::len_zero, clippy::new_without_default)]

pub mod channel;
pub mod config;
pub mod flip;
pub mod logger;
pub mod pipe;
pub mod screen;
pub mod time;
pub mod utils;
pub mod video;
