//! Router module - touch arbitration and bank switching
//!
//! The Router owns the [`BankRegistry`] and is its only writer. It handles:
//! - X-Touch input: fader moves, touch sensors, bank select buttons
//! - Remote automation arriving over the OSC mirror
//! - Output sync after bank switches and at startup
//!
//! Every handler runs to completion and returns the outbound messages it
//! caused, in order. The caller sends them before feeding the next event,
//! which keeps cause and effect ordered per fader.

mod classify;
mod mirror_input;
mod sync;
mod xtouch_input;

pub use classify::{classify, Inbound};
pub use mirror_input::MirrorCommand;
pub use sync::{Heartbeat, OutputSync};


use crate::midi::format_hex;
use crate::state::{BankRegistry, RegistrySnapshot};
use std::fmt;

/// Destination of a surface message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Motor fader positions
    Motor,
    /// Button, bank indicator and heartbeat LEDs
    Led,
}

/// Message for the physical control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceMessage {
    pub lane: Lane,
    pub bytes: [u8; 3],
}

impl SurfaceMessage {
    pub fn motor(bytes: [u8; 3]) -> Self {
        Self {
            lane: Lane::Motor,
            bytes,
        }
    }

    pub fn led(bytes: [u8; 3]) -> Self {
        Self {
            lane: Lane::Led,
            bytes,
        }
    }
}

impl fmt::Display for SurfaceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.lane, format_hex(&self.bytes))
    }
}

/// Normalized value published on the OSC mirror
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorMessage {
    pub address: String,
    pub value: f32,
}

impl MirrorMessage {
    /// `/bank{n}/fader{i}` for a 0-based bank and 1-based strip
    pub fn fader(bank: usize, strip: u8, value: f64) -> Self {
        Self {
            address: format!("/bank{}/fader{}", bank + 1, strip),
            value: value as f32,
        }
    }
}

impl fmt::Display for MirrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.4}", self.address, self.value)
    }
}

/// Anything the router wants sent
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Surface(SurfaceMessage),
    Mirror(MirrorMessage),
}

/// Main router: single owner and writer of the bank registry
pub struct Router {
    pub(crate) registry: BankRegistry,
    /// Bank each strip's current touch started in, indexed by strip - 1
    ///
    /// The hand stays on the physical fader across a bank switch, so its
    /// release belongs to the bank it was pressed in.
    pub(crate) touch_origin: Vec<Option<usize>>,
}

impl Router {
    pub fn new(registry: BankRegistry) -> Self {
        let strips = usize::from(registry.layout().strips);
        Self {
            registry,
            touch_origin: vec![None; strips],
        }
    }

    /// Read-only view of the registry
    pub fn registry(&self) -> &BankRegistry {
        &self.registry
    }

    /// Consistent snapshot of every bank for persistence
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.to_snapshot()
    }

    /// Everything needed to bring a freshly connected surface and mirror in
    /// line with memory: active bank faders, its button LEDs, bank indicators
    pub fn startup_sync(&self) -> Vec<Outbound> {
        self.full_sync()
    }

    /// Resync for the active bank (faders, buttons) plus all bank indicators
    pub(crate) fn full_sync(&self) -> Vec<Outbound> {
        let sync = OutputSync::new(&self.registry);
        let active = self.registry.active();

        let mut out = sync.sync_bank(active);
        out.extend(sync.sync_buttons(active));
        out.extend(sync.sync_bank_indicators());
        out
    }
}
