//! XTouch Banks
//!
//! Six banks of motorized fader state for a Behringer X-Touch, switched from
//! the surface's bank buttons, mirrored over OSC and persisted to JSON.

pub mod config;
pub mod midi;
pub mod osc;
pub mod paths;
pub mod router;
pub mod state;
pub mod xtouch;
