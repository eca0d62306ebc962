//! # Periodic Trigger Counter
//!
//! Per-module countdown that opens a failsafe window once every 1001 cycles
//! and rate-limits spectrum scans.
//!
//! The counter is post-decremented after every frame. When it is observed
//! at 0 it reloads to 1000 instead of going negative.

use super::protocol::{PERIODIC_COUNTER_RELOAD, SPECTRUM_COUNTER_LOCK};

/// Rolling per-module cycle counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicCounter {
    value: u16,
}

impl Default for PeriodicCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicCounter {
    /// Counter starting at the reload value
    pub const fn new() -> Self {
        Self {
            value: PERIODIC_COUNTER_RELOAD,
        }
    }

    /// Counter starting at an arbitrary value
    pub const fn with_value(value: u16) -> Self {
        Self { value }
    }

    /// Current value
    pub fn value(&self) -> u16 {
        self.value
    }

    /// True on the one cycle per window where failsafe values are due
    pub fn is_due(&self) -> bool {
        self.value == 0
    }

    /// True while the counter sits above its normal window
    pub fn is_locked(&self) -> bool {
        self.value > PERIODIC_COUNTER_RELOAD
    }

    /// Push the counter above its normal window
    pub fn lock(&mut self) {
        self.value = SPECTRUM_COUNTER_LOCK;
    }

    /// Advance by one cycle
    pub fn advance(&mut self) {
        self.value = match self.value {
            0 => PERIODIC_COUNTER_RELOAD,
            n => n - 1,
        };
    }
}
