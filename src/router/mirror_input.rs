//! Remote automation arriving over the OSC mirror

use super::{Outbound, SurfaceMessage};
use tracing::{debug, trace};

/// A decoded remote write
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorCommand {
    /// `/bank{n}/fader{i} <value>`
    SetFader { bank: usize, strip: u8, value: f64 },
    /// `/bank{n}/buttons{i}/{b} <on>`
    SetButton {
        bank: usize,
        strip: u8,
        button: usize,
        on: bool,
    },
}

impl super::Router {
    /// Apply a remote write
    ///
    /// A hand on the fader wins over automation. Writes to the bank shown on
    /// the surface move the motor or light the LED immediately; writes to
    /// other banks show up on the next switch.
    pub fn on_mirror_command(&mut self, command: MirrorCommand) -> Vec<Outbound> {
        let active = self.registry.active();

        match command {
            MirrorCommand::SetFader { bank, strip, value } => {
                let Some(fader) = self
                    .registry
                    .bank_mut(bank)
                    .and_then(|b| b.fader_mut(strip))
                else {
                    debug!("Remote write to unknown fader {} in bank {}", strip, bank + 1);
                    return Vec::new();
                };

                if fader.is_touching() {
                    trace!("Fader {} in bank {} is touched, ignoring remote write", strip, bank + 1);
                    return Vec::new();
                }

                fader.set_current(value);
                fader.record_pending(fader.current());
                debug!("Remote set fader {} in bank {} to {:.3}", strip, bank + 1, fader.current());

                if bank == active {
                    vec![Outbound::Surface(SurfaceMessage::motor(fader.encoded()))]
                } else {
                    Vec::new()
                }
            }
            MirrorCommand::SetButton {
                bank,
                strip,
                button,
                on,
            } => {
                let Some(buttons) = self
                    .registry
                    .bank_mut(bank)
                    .and_then(|b| b.buttons_mut(strip))
                else {
                    debug!("Remote write to unknown strip {} in bank {}", strip, bank + 1);
                    return Vec::new();
                };
                let Some(bytes) = buttons.set_status(button, on) else {
                    debug!(
                        "Remote write to unknown button {}/{} in bank {}",
                        buttons.index(),
                        button,
                        bank + 1
                    );
                    return Vec::new();
                };

                debug!(
                    "Remote set button {}/{} in bank {} {}",
                    buttons.index(),
                    button,
                    bank + 1,
                    if on { "on" } else { "off" }
                );

                if bank == active {
                    vec![Outbound::Surface(SurfaceMessage::led(bytes))]
                } else {
                    Vec::new()
                }
            }
        }
    }
}
