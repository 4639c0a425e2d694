//! All banks plus the currently selected one

use super::bank::Bank;
use super::persistence::RegistrySnapshot;
use crate::config::LayoutConfig;
use tracing::{debug, warn};

/// Owner of every bank, strip, fader and button set
///
/// `active` is a valid index into `banks` whenever the layout has banks.
#[derive(Debug, Clone, PartialEq)]
pub struct BankRegistry {
    layout: LayoutConfig,
    banks: Vec<Bank>,
    active: usize,
}

impl BankRegistry {
    /// Fresh registry, bank 0 active
    pub fn new(layout: LayoutConfig) -> Self {
        let banks = (0..layout.bank_count).map(|_| Bank::new(&layout)).collect();
        Self {
            layout,
            banks,
            active: 0,
        }
    }

    /// Rebuild a registry from a snapshot
    ///
    /// Missing or malformed bank entries become fresh banks; entries beyond
    /// the layout's bank count are dropped. Bank 0 is active.
    pub fn from_snapshot(layout: LayoutConfig, snapshot: &RegistrySnapshot) -> Self {
        if snapshot.banks.len() > layout.bank_count {
            warn!(
                "Snapshot holds {} banks, layout has {}; ignoring the extra banks",
                snapshot.banks.len(),
                layout.bank_count
            );
        }

        let banks = (0..layout.bank_count)
            .map(|index| {
                match snapshot.banks.get(index) {
                    Some(Some(entry)) => match Bank::from_snapshot(&layout, entry) {
                        Some(bank) => return bank,
                        None => warn!(
                            "Bank {} in snapshot does not match the layout, using defaults",
                            index + 1
                        ),
                    },
                    Some(None) => warn!("Bank {} in snapshot is malformed, using defaults", index + 1),
                    None => debug!("Bank {} missing from snapshot, using defaults", index + 1),
                }
                Bank::new(&layout)
            })
            .collect();

        Self {
            layout,
            banks,
            active: 0,
        }
    }

    /// Persisted form of every bank, in order
    pub fn to_snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            banks: self.banks.iter().map(|b| Some(b.to_snapshot())).collect(),
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    /// Index of the bank shown on the surface
    pub fn active(&self) -> usize {
        self.active
    }

    /// Select the bank shown on the surface; false (and no change) when out of range
    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.banks.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    pub fn bank(&self, index: usize) -> Option<&Bank> {
        self.banks.get(index)
    }

    pub fn bank_mut(&mut self, index: usize) -> Option<&mut Bank> {
        self.banks.get_mut(index)
    }

    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.iter()
    }

    /// Bank shown on the surface; `None` only for a layout without banks
    pub fn active_bank(&self) -> Option<&Bank> {
        self.banks.get(self.active)
    }

    pub fn active_bank_mut(&mut self) -> Option<&mut Bank> {
        self.banks.get_mut(self.active)
    }
}
