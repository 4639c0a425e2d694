//! State management module - banks of motor faders and LED buttons
//!
//! The [`BankRegistry`] owns every bank; each bank holds one [`Fader`] and
//! one [`ButtonSet`] per strip. Snapshots of the registry are persisted to a
//! JSON file by the persistence actor and restored at startup.

mod bank;
mod buttons;
mod fader;
mod persistence;
pub mod persistence_actor;
mod registry;

pub use bank::{Bank, Strip};
pub use buttons::{ButtonSet, BUTTONS_PER_STRIP};
pub use fader::Fader;
pub use persistence::{BankSnapshot, FaderRecord, RegistrySnapshot};
pub use persistence_actor::{PersistenceActor, PersistenceActorHandle};
pub use registry::BankRegistry;
