//! Control surface layout: bank/strip counts and the note tables that give
//! inbound MIDI bytes their meaning.

use serde::{Deserialize, Serialize};

use crate::midi::{NOTE_ON, PITCH_BEND};

/// Fixed device layout supplied once at construction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Number of banks the registry holds
    pub bank_count: usize,
    /// Fader strips per bank (9 on the X-Touch: 8 channels + master)
    pub strips: u8,
    /// Pitch bend status of strip 1; strip `i` uses `pitch_bend_base + i - 1`
    pub pitch_bend_base: u8,
    /// Status byte for touch sensors, buttons and LEDs
    pub note_on: u8,
    /// Touch sensor note of strip 1; one note per strip
    pub touch_note_base: u8,
    /// Bank select button notes, in bank order (also the indicator LEDs)
    pub bank_select_notes: Vec<u8>,
    /// LED toggled by the heartbeat
    pub heartbeat_note: u8,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            bank_count: 6,
            strips: 9,
            pitch_bend_base: PITCH_BEND,
            note_on: NOTE_ON,
            touch_note_base: 0x68,
            bank_select_notes: vec![91, 92, 94, 93, 95, 86],
            heartbeat_note: 0x18,
        }
    }
}

impl LayoutConfig {
    /// Strip (1-based) addressed by a pitch bend status byte
    pub fn pitch_bend_strip(&self, status: u8) -> Option<u8> {
        let offset = status.checked_sub(self.pitch_bend_base)?;
        (offset < self.strips).then_some(offset + 1)
    }

    /// Pitch bend status byte of a strip (1-based)
    pub fn pitch_bend_status(&self, strip: u8) -> u8 {
        self.pitch_bend_base.wrapping_add(strip.saturating_sub(1))
    }

    /// Strip (1-based) whose touch sensor sends this note
    pub fn touch_strip(&self, note: u8) -> Option<u8> {
        let offset = note.checked_sub(self.touch_note_base)?;
        (offset < self.strips).then_some(offset + 1)
    }

    /// Bank index selected by a bank button note
    pub fn bank_for_note(&self, note: u8) -> Option<usize> {
        self.bank_select_notes.iter().position(|&n| n == note)
    }

    /// Bank indicator LED note for a bank index
    pub fn indicator_note(&self, bank: usize) -> Option<u8> {
        self.bank_select_notes.get(bank).copied()
    }

    /// Validate layout consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bank_count == 0 {
            anyhow::bail!("layout.bank_count must be at least 1");
        }
        if self.strips == 0 {
            anyhow::bail!("layout.strips must be at least 1");
        }
        if self.pitch_bend_base & 0xF0 != PITCH_BEND {
            anyhow::bail!(
                "layout.pitch_bend_base 0x{:02X} is not a pitch bend status",
                self.pitch_bend_base
            );
        }
        if u16::from(self.pitch_bend_base & 0x0F) + u16::from(self.strips) > 16 {
            anyhow::bail!(
                "layout.strips {} does not fit on MIDI channels starting at 0x{:02X}",
                self.strips,
                self.pitch_bend_base
            );
        }
        if self.note_on & 0xF0 != NOTE_ON {
            anyhow::bail!("layout.note_on 0x{:02X} is not a note on status", self.note_on);
        }
        if u16::from(self.touch_note_base) + u16::from(self.strips) > 128 {
            anyhow::bail!("layout touch sensor notes exceed 127");
        }
        if self.bank_select_notes.len() != self.bank_count {
            anyhow::bail!(
                "layout.bank_select_notes has {} entries but bank_count is {}",
                self.bank_select_notes.len(),
                self.bank_count
            );
        }

        let mut seen = std::collections::HashSet::new();
        for &note in &self.bank_select_notes {
            if note > 127 {
                anyhow::bail!("bank select note {} is invalid (must be 0-127)", note);
            }
            if !seen.insert(note) {
                anyhow::bail!("bank select note {} is listed twice", note);
            }
            if self.touch_strip(note).is_some() {
                anyhow::bail!(
                    "bank select note {} overlaps the touch sensor range",
                    note
                );
            }
        }

        if self.heartbeat_note > 127 {
            anyhow::bail!("layout.heartbeat_note {} is invalid", self.heartbeat_note);
        }

        Ok(())
    }
}
