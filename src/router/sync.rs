//! Output sync: messages that bring surface and mirror in line with memory
//!
//! Read-only over the registry. Calling any of these twice only costs
//! bandwidth.

use super::{MirrorMessage, Outbound, SurfaceMessage};
use crate::config::LayoutConfig;
use crate::midi::{VELOCITY_OFF, VELOCITY_ON};
use crate::state::BankRegistry;

pub struct OutputSync<'a> {
    registry: &'a BankRegistry,
}

impl<'a> OutputSync<'a> {
    pub fn new(registry: &'a BankRegistry) -> Self {
        Self { registry }
    }

    /// Motor position and mirror value of every fader in a bank
    pub fn sync_bank(&self, bank: usize) -> Vec<Outbound> {
        let Some(faders) = self.registry.bank(bank) else {
            return Vec::new();
        };

        faders
            .faders()
            .flat_map(|fader| {
                [
                    Outbound::Surface(SurfaceMessage::motor(fader.encoded())),
                    Outbound::Mirror(MirrorMessage::fader(bank, fader.index(), fader.current())),
                ]
            })
            .collect()
    }

    /// LED message of every button in a bank
    pub fn sync_buttons(&self, bank: usize) -> Vec<Outbound> {
        let Some(bank) = self.registry.bank(bank) else {
            return Vec::new();
        };

        bank.strips()
            .flat_map(|strip| strip.buttons.encoded().iter())
            .map(|bytes| Outbound::Surface(SurfaceMessage::led(*bytes)))
            .collect()
    }

    /// Bank indicator LEDs: on for the active bank, off for the rest
    pub fn sync_bank_indicators(&self) -> Vec<Outbound> {
        indicator_messages(self.registry.layout(), self.registry.active())
    }
}

fn indicator_messages(layout: &LayoutConfig, active: usize) -> Vec<Outbound> {
    (0..layout.bank_count)
        .filter_map(|bank| {
            let note = layout.indicator_note(bank)?;
            let velocity = if bank == active { VELOCITY_ON } else { VELOCITY_OFF };
            Some(Outbound::Surface(SurfaceMessage::led([layout.note_on, note, velocity])))
        })
        .collect()
}

/// Blinking "alive" LED
#[derive(Debug, Clone)]
pub struct Heartbeat {
    note_on: u8,
    note: u8,
    lit: bool,
}

impl Heartbeat {
    pub fn new(layout: &LayoutConfig) -> Self {
        Self {
            note_on: layout.note_on,
            note: layout.heartbeat_note,
            lit: false,
        }
    }

    /// Flip the LED and return the message for its new state
    pub fn tick(&mut self) -> SurfaceMessage {
        self.lit = !self.lit;
        let velocity = if self.lit { VELOCITY_ON } else { VELOCITY_OFF };
        SurfaceMessage::led([self.note_on, self.note, velocity])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Lane;

    #[test]
    fn test_sync_bank_covers_every_fader() {
        let mut registry = BankRegistry::new(LayoutConfig::default());
        registry.bank_mut(2).unwrap().fader_mut(4).unwrap().set_current(1.0);

        let out = OutputSync::new(&registry).sync_bank(2);
        assert_eq!(out.len(), 18);
        assert_eq!(
            out[6],
            Outbound::Surface(SurfaceMessage::motor([0xE3, 127, 127]))
        );
        assert_eq!(
            out[7],
            Outbound::Mirror(MirrorMessage {
                address: "/bank3/fader4".to_string(),
                value: 1.0
            })
        );
    }

    #[test]
    fn test_sync_unknown_bank_is_empty() {
        let registry = BankRegistry::new(LayoutConfig::default());
        assert!(OutputSync::new(&registry).sync_bank(6).is_empty());
        assert!(OutputSync::new(&registry).sync_buttons(6).is_empty());
    }

    #[test]
    fn test_sync_buttons() {
        let mut registry = BankRegistry::new(LayoutConfig::default());
        registry.bank_mut(0).unwrap().buttons_mut(2).unwrap().set_status(1, true);

        let out = OutputSync::new(&registry).sync_buttons(0);
        assert_eq!(out.len(), 36);
        assert!(out.contains(&Outbound::Surface(SurfaceMessage::led([0x90, 9, 127]))));
        assert!(out.iter().all(|o| matches!(o, Outbound::Surface(m) if m.lane == Lane::Led)));
    }

    #[test]
    fn test_bank_indicators() {
        let mut registry = BankRegistry::new(LayoutConfig::default());
        registry.set_active(2);

        let out = OutputSync::new(&registry).sync_bank_indicators();
        let expected: Vec<Outbound> = [(91, 0), (92, 0), (94, 127), (93, 0), (95, 0), (86, 0)]
            .iter()
            .map(|&(note, velocity)| Outbound::Surface(SurfaceMessage::led([0x90, note, velocity])))
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_bank_indicators_follow_layout_table() {
        let layout = LayoutConfig {
            bank_count: 2,
            bank_select_notes: vec![54, 55],
            ..LayoutConfig::default()
        };
        let mut registry = BankRegistry::new(layout);
        registry.set_active(1);

        assert_eq!(
            OutputSync::new(&registry).sync_bank_indicators(),
            vec![
                Outbound::Surface(SurfaceMessage::led([0x90, 54, 0])),
                Outbound::Surface(SurfaceMessage::led([0x90, 55, 127])),
            ]
        );
    }

    #[test]
    fn test_sync_is_idempotent() {
        let registry = BankRegistry::new(LayoutConfig::default());
        let sync = OutputSync::new(&registry);
        assert_eq!(sync.sync_bank(0), sync.sync_bank(0));
        assert_eq!(sync.sync_bank_indicators(), sync.sync_bank_indicators());
    }

    #[test]
    fn test_heartbeat_toggles() {
        let mut heartbeat = Heartbeat::new(&LayoutConfig::default());
        assert_eq!(heartbeat.tick().bytes, [0x90, 0x18, 0x7F]);
        assert_eq!(heartbeat.tick().bytes, [0x90, 0x18, 0x00]);
        assert_eq!(heartbeat.tick().bytes, [0x90, 0x18, 0x7F]);
    }
}
