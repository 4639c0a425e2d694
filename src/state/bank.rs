//! One complete control surface layout: a fixed, ordered set of strips

use super::buttons::ButtonSet;
use super::fader::Fader;
use super::persistence::{BankSnapshot, FaderRecord};
use crate::config::LayoutConfig;

/// A fader and the buttons above it
#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    pub fader: Fader,
    pub buttons: ButtonSet,
}

/// Strips keyed by their 1-based position
#[derive(Debug, Clone, PartialEq)]
pub struct Bank {
    strips: Vec<Strip>,
}

impl Bank {
    /// Fresh bank with every fader at 0.0 and every LED off
    pub fn new(layout: &LayoutConfig) -> Self {
        let strips = (1..=layout.strips)
            .map(|index| Strip {
                fader: Fader::new(index, layout.pitch_bend_status(index)),
                buttons: ButtonSet::new(index, layout.note_on),
            })
            .collect();

        Self { strips }
    }

    /// Number of strips
    pub fn len(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    pub fn strip(&self, index: u8) -> Option<&Strip> {
        self.strips.get(usize::from(index).checked_sub(1)?)
    }

    pub fn strip_mut(&mut self, index: u8) -> Option<&mut Strip> {
        self.strips.get_mut(usize::from(index).checked_sub(1)?)
    }

    pub fn fader(&self, index: u8) -> Option<&Fader> {
        self.strip(index).map(|s| &s.fader)
    }

    pub fn fader_mut(&mut self, index: u8) -> Option<&mut Fader> {
        self.strip_mut(index).map(|s| &mut s.fader)
    }

    pub fn buttons_mut(&mut self, index: u8) -> Option<&mut ButtonSet> {
        self.strip_mut(index).map(|s| &mut s.buttons)
    }

    /// Strips in position order
    pub fn strips(&self) -> impl Iterator<Item = &Strip> {
        self.strips.iter()
    }

    /// Faders in position order
    pub fn faders(&self) -> impl Iterator<Item = &Fader> {
        self.strips.iter().map(|s| &s.fader)
    }

    /// Persisted form of the bank (faders only)
    pub fn to_snapshot(&self) -> BankSnapshot {
        BankSnapshot {
            faders: self
                .faders()
                .map(|f| FaderRecord {
                    index: f.index(),
                    current: f.current(),
                    is_touching: f.is_touching(),
                })
                .collect(),
        }
    }

    /// Rebuild a bank from its persisted form
    ///
    /// Faders absent from the snapshot keep their defaults. Returns `None`
    /// when the snapshot names a strip this layout does not have.
    pub fn from_snapshot(layout: &LayoutConfig, snapshot: &BankSnapshot) -> Option<Self> {
        let mut bank = Self::new(layout);
        for record in &snapshot.faders {
            let fader = bank.fader_mut(record.index)?;
            fader.set_current(record.current);
            fader.record_pending(record.current);
            fader.set_touching(record.is_touching);
        }
        Some(bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bank_layout() {
        let layout = LayoutConfig::default();
        let bank = Bank::new(&layout);

        assert_eq!(bank.len(), 9);
        assert_eq!(bank.fader(1).unwrap().encoded()[0], 0xE0);
        assert_eq!(bank.fader(9).unwrap().encoded()[0], 0xE8);
        assert!(bank.fader(0).is_none());
        assert!(bank.fader(10).is_none());

        let indices: Vec<u8> = bank.faders().map(|f| f.index()).collect();
        assert_eq!(indices, (1..=9).collect::<Vec<u8>>());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let layout = LayoutConfig::default();
        let mut bank = Bank::new(&layout);
        bank.fader_mut(2).unwrap().set_current(0.75);
        bank.fader_mut(5).unwrap().set_touching(true);

        let restored = Bank::from_snapshot(&layout, &bank.to_snapshot()).unwrap();
        assert_eq!(restored.fader(2).unwrap().current(), 0.75);
        assert_eq!(restored.fader(2).unwrap().encoded(), bank.fader(2).unwrap().encoded());
        assert!(restored.fader(5).unwrap().is_touching());
    }

    #[test]
    fn test_snapshot_with_unknown_strip_rejected() {
        let layout = LayoutConfig::default();
        let snapshot = BankSnapshot {
            faders: vec![FaderRecord {
                index: 12,
                current: 0.5,
                is_touching: false,
            }],
        };
        assert!(Bank::from_snapshot(&layout, &snapshot).is_none());
    }

    #[test]
    fn test_partial_snapshot_keeps_defaults() {
        let layout = LayoutConfig::default();
        let snapshot = BankSnapshot {
            faders: vec![FaderRecord {
                index: 4,
                current: 0.4,
                is_touching: false,
            }],
        };
        let bank = Bank::from_snapshot(&layout, &snapshot).unwrap();
        assert_eq!(bank.fader(4).unwrap().current(), 0.4);
        assert_eq!(bank.fader(1).unwrap().current(), 0.0);
    }
}
