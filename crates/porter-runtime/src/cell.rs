//! [`MissionCell`] – the mission state and delivery counter shared between
//! the supervisor and the behavior lane.
//!
//! Both values are atomics so reads from the supervisor are never torn.  The
//! single-writer discipline is enforced with compare-and-swap:
//!
//! | Writer | Transition |
//! |---|---|
//! | Supervisor | `<behavior state>` → `Dispatched` via [`MissionCell::begin_dispatch`] |
//! | Behavior lane | `Dispatched` → `<next state>` via [`MissionCell::finish`] |
//! | Supervisor | anything → `Idle` via [`MissionCell::close`] |
//!
//! Any other interleaving fails the exchange and surfaces as
//! [`PorterError::DispatchConflict`].

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use porter_types::{MissionState, PorterError};

#[derive(Debug)]
pub struct MissionCell {
    state: AtomicU8,
    delivered: AtomicU32,
}

impl Default for MissionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionCell {
    /// A cell in the mission-start configuration: `Searching`, nothing
    /// delivered.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(MissionState::Searching.into()),
            delivered: AtomicU32::new(0),
        }
    }

    /// Current mission state.
    pub fn state(&self) -> MissionState {
        decode(self.state.load(Ordering::Acquire))
    }

    /// Deliveries completed so far.
    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Reset to the mission-start configuration.
    pub fn start(&self) {
        self.delivered.store(0, Ordering::Release);
        self.state
            .store(MissionState::Searching.into(), Ordering::Release);
    }

    /// Claim the robot for a behavior: `expected` → `Dispatched`.
    ///
    /// # Errors
    ///
    /// [`PorterError::DispatchConflict`] if the state is no longer
    /// `expected`.
    pub fn begin_dispatch(&self, expected: MissionState) -> Result<(), PorterError> {
        self.swap(expected, MissionState::Dispatched)
    }

    /// Hand the robot back with the behavior's outcome: `Dispatched` →
    /// `next`.
    ///
    /// # Errors
    ///
    /// - [`PorterError::MissionClosed`] if the supervisor already closed the
    ///   mission (a behavior outliving an abort).
    /// - [`PorterError::DispatchConflict`] for any other unexpected state.
    pub fn finish(&self, next: MissionState) -> Result<(), PorterError> {
        match self.swap(MissionState::Dispatched, next) {
            Err(PorterError::DispatchConflict {
                found: MissionState::Idle,
                ..
            }) => Err(PorterError::MissionClosed),
            other => other,
        }
    }

    /// Close the mission (`Idle`), returning the state it was in.
    pub fn close(&self) -> MissionState {
        decode(
            self.state
                .swap(MissionState::Idle.into(), Ordering::AcqRel),
        )
    }

    /// Count one completed delivery and return the new total.
    pub fn record_delivery(&self) -> u32 {
        self.delivered.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn swap(&self, expected: MissionState, next: MissionState) -> Result<(), PorterError> {
        self.state
            .compare_exchange(
                expected.into(),
                next.into(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|found| PorterError::DispatchConflict {
                expected,
                found: decode(found),
            })
    }
}

// Only `MissionState` values are ever stored, so a bad byte means memory
// corruption; report it as a fault state rather than panic.
fn decode(raw: u8) -> MissionState {
    MissionState::try_from(raw).unwrap_or(MissionState::Faulted)
}
