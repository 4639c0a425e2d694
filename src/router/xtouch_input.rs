//! X-Touch MIDI input handling and routing

use super::{classify, Inbound, MirrorMessage, Outbound, SurfaceMessage};
use crate::midi::{convert, format_hex};
use tracing::{debug, info, trace};

impl super::Router {
    /// Process one MIDI message from X-Touch hardware
    ///
    /// Handles:
    /// - Fader moves (pitch bend), honoured only while the fader is touched
    /// - Touch sensors: release commits the fader and parks the motor
    /// - Bank select buttons
    pub fn on_midi_from_xtouch(&mut self, raw: &[u8]) -> Vec<Outbound> {
        let &[status, data1, data2, ..] = raw else {
            trace!("Ignoring short MIDI message: {}", format_hex(raw));
            return Vec::new();
        };

        match classify(self.registry.layout(), status, data1, data2) {
            Inbound::PitchBend { strip, value14 } => self.handle_pitch_bend(strip, value14),
            Inbound::Touch { strip, on } => self.handle_touch(strip, on),
            Inbound::BankSelect { note } => self.handle_bank_select(note),
            Inbound::Indicator { note, velocity } => {
                trace!("Note {} velocity {} ignored", note, velocity);
                Vec::new()
            }
            Inbound::Unknown => {
                debug!(
                    "Unhandled message: status=0x{:02X}, data1={}, data2={}",
                    status, data1, data2
                );
                Vec::new()
            }
        }
    }

    /// Fader move reported by the surface
    ///
    /// An untouched fader moving is the motor answering our own positioning;
    /// forwarding it would start a feedback loop, so it is dropped.
    pub(crate) fn handle_pitch_bend(&mut self, strip: u8, value14: u16) -> Vec<Outbound> {
        let bank = self.registry.active();
        let Some(fader) = self
            .registry
            .active_bank_mut()
            .and_then(|b| b.fader_mut(strip))
        else {
            trace!("Pitch bend for unknown fader {}", strip);
            return Vec::new();
        };

        if !fader.is_touching() {
            trace!("Dropping pitch bend echo for untouched fader {}", strip);
            return Vec::new();
        }

        let value = convert::from_14bit(value14);
        fader.record_pending(value);
        debug!(
            "Fader {} in bank {} moved to {:.3}",
            strip,
            bank + 1,
            value
        );

        vec![Outbound::Mirror(MirrorMessage::fader(bank, strip, value))]
    }

    /// Touch sensor change
    ///
    /// Release is the only place a pending value becomes current, and the
    /// motor is sent there exactly once.
    pub(crate) fn handle_touch(&mut self, strip: u8, on: bool) -> Vec<Outbound> {
        let Some(slot) = usize::from(strip)
            .checked_sub(1)
            .filter(|&slot| slot < self.touch_origin.len())
        else {
            trace!("Touch for unknown fader {}", strip);
            return Vec::new();
        };

        if on {
            self.touch_on(slot, strip)
        } else {
            self.touch_off(slot, strip)
        }
    }

    fn touch_on(&mut self, slot: usize, strip: u8) -> Vec<Outbound> {
        let active = self.registry.active();

        if let Some(previous) = self.touch_origin[slot].filter(|&bank| bank != active) {
            // The release of the earlier touch never arrived
            if let Some(stale) = self
                .registry
                .bank_mut(previous)
                .and_then(|b| b.fader_mut(strip))
            {
                stale.set_touching(false);
            }
        }

        let Some(fader) = self
            .registry
            .bank_mut(active)
            .and_then(|b| b.fader_mut(strip))
        else {
            trace!("Touch for unknown fader {}", strip);
            return Vec::new();
        };

        if !fader.is_touching() {
            // A touch without movement commits the position it started from
            fader.record_pending(fader.current());
        }
        fader.set_touching(true);
        self.touch_origin[slot] = Some(active);
        debug!("Fader {} in bank {} is now touching", strip, active + 1);

        Vec::new()
    }

    fn touch_off(&mut self, slot: usize, strip: u8) -> Vec<Outbound> {
        let active = self.registry.active();
        // No recorded origin: a touch restored from the snapshot
        let origin = self.touch_origin[slot].take().unwrap_or(active);

        let Some(fader) = self
            .registry
            .bank_mut(origin)
            .and_then(|b| b.fader_mut(strip))
        else {
            trace!("Release for unknown fader {}", strip);
            return Vec::new();
        };

        if !fader.is_touching() {
            trace!("Release for fader {} that was not touched", strip);
            return Vec::new();
        }

        fader.set_touching(false);
        let bytes = fader.commit_pending();
        debug!(
            "Fader {} in bank {} released at {:.3}",
            strip,
            origin + 1,
            fader.current()
        );

        if origin == active {
            return vec![Outbound::Surface(SurfaceMessage::motor(bytes))];
        }

        // The surface shows another bank now; park the motor at its value
        match self.registry.bank(active).and_then(|b| b.fader(strip)) {
            Some(shown) => vec![Outbound::Surface(SurfaceMessage::motor(shown.encoded()))],
            None => Vec::new(),
        }
    }

    /// Bank select button press
    pub(crate) fn handle_bank_select(&mut self, note: u8) -> Vec<Outbound> {
        let Some(bank) = self.registry.layout().bank_for_note(note) else {
            info!("Unhandled note on: note={}, velocity=127", note);
            return Vec::new();
        };

        if !self.registry.set_active(bank) {
            return Vec::new();
        }
        info!("Switched to bank {}", bank + 1);

        self.full_sync()
    }
}
