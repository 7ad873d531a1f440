//! Time subsystem.
//!
//! Frame pacing for the render loop, without coupling to the runtime:
//! - `FramePacer::tick()` blocks until the frame budget has elapsed
//! - `FramePacer::deadline()` feeds event-loop waits (`ControlFlow::WaitUntil`)

mod frame_pacer;

pub use frame_pacer::{FramePacer, FrameTime};
