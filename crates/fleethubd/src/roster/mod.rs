//! Shared slot table for the fixed device roster.
//!
//! The roster is allocated once with an ordered list of names; a slot's
//! position is its address for dispatch and display. One mutex guards the
//! whole table. Mutations hold it only for plain field assignments and
//! [`Roster::snapshot`] copies every slot under a single acquisition, so a
//! snapshot is always a consistent cut across the table.

mod errors;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use fleethub_config::DuplicatePolicy;

pub use self::errors::RosterError;
use crate::transport::{ConnectionHandle, SessionId};

const ROSTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::roster");

/// Longest stored status, in bytes.
pub const STATUS_CAPACITY: usize = 1023;

/// Status payload that raises a slot's error flag.
pub const ERROR_STATUS: &str = "ERROR";

#[derive(Debug)]
struct Slot {
    connection: Option<ConnectionHandle>,
    last_status: String,
    error_flag: bool,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            connection: None,
            last_status: String::new(),
            error_flag: false,
        }
    }
}

/// Point-in-time copy of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub index: usize,
    pub name: String,
    pub connected: bool,
    pub last_status: String,
    pub error_flag: bool,
}

/// Result of a successful [`Roster::occupy`].
#[derive(Debug)]
pub enum Occupancy {
    /// The slot was vacant.
    Vacant,
    /// The slot was held and the previous session's handle was displaced.
    ///
    /// The caller decides how to end the displaced connection.
    Evicted(ConnectionHandle),
}

/// Fixed, ordered table of device slots.
#[derive(Debug)]
pub struct Roster {
    names: Vec<String>,
    policy: DuplicatePolicy,
    slots: Mutex<Vec<Slot>>,
}

impl Roster {
    /// Builds a roster whose slot order follows `names`.
    pub fn new<I, S>(names: I, policy: DuplicatePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let slots = names.iter().map(|_| Slot::vacant()).collect();
        Self {
            names,
            policy,
            slots: Mutex::new(slots),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Slot names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the slot at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Duplicate registration policy in force.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Index of the first slot named exactly `name`.
    ///
    /// Names never change, so the lookup does not take the lock.
    #[must_use]
    pub fn find_slot_by_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Marks the slot connected and stores the session's handle.
    ///
    /// With [`DuplicatePolicy::Reject`] an occupied slot yields
    /// [`RosterError::AlreadyOccupied`]. With [`DuplicatePolicy::Evict`] the
    /// previous handle is returned in [`Occupancy::Evicted`].
    pub fn occupy(
        &self,
        index: usize,
        handle: ConnectionHandle,
    ) -> Result<Occupancy, RosterError> {
        let name = self.checked_name(index)?;
        let mut slots = self.lock_for_write()?;
        let slot = &mut slots[index];
        let session = handle.session();
        let occupancy = match (slot.connection.take(), self.policy) {
            (None, _) => Occupancy::Vacant,
            (Some(existing), DuplicatePolicy::Reject) => {
                slot.connection = Some(existing);
                return Err(RosterError::AlreadyOccupied {
                    name: name.to_owned(),
                });
            }
            (Some(existing), DuplicatePolicy::Evict) => Occupancy::Evicted(existing),
        };
        slot.connection = Some(handle);
        drop(slots);
        info!(target: ROSTER_TARGET, slot = index, name, %session, "slot occupied");
        Ok(occupancy)
    }

    /// Records the latest status reported by the slot's occupant.
    ///
    /// The payload is truncated to [`STATUS_CAPACITY`] bytes. Returns
    /// `false` without changing anything when `session` no longer holds the
    /// slot.
    pub fn update_status(
        &self,
        index: usize,
        session: SessionId,
        payload: &str,
    ) -> Result<bool, RosterError> {
        self.checked_name(index)?;
        let mut slots = self.lock_for_write()?;
        let slot = &mut slots[index];
        if !held_by(slot, session) {
            return Ok(false);
        }
        let status = truncate_status(payload);
        slot.error_flag = status == ERROR_STATUS;
        slot.last_status.clear();
        slot.last_status.push_str(status);
        Ok(true)
    }

    /// Marks the slot disconnected if `session` still holds it.
    ///
    /// Status and error flag keep their last values. Returns whether the
    /// slot was released.
    pub fn vacate(&self, index: usize, session: SessionId) -> Result<bool, RosterError> {
        let name = self.checked_name(index)?;
        let mut slots = self.lock_for_write()?;
        let slot = &mut slots[index];
        if !held_by(slot, session) {
            return Ok(false);
        }
        slot.connection = None;
        drop(slots);
        debug!(target: ROSTER_TARGET, slot = index, name, %session, "slot vacated");
        Ok(true)
    }

    /// Copy of the live handle for `index`, if the slot is connected.
    ///
    /// The lock is released before this returns; writes through the handle
    /// never block the table.
    pub fn connection(&self, index: usize) -> Result<Option<ConnectionHandle>, RosterError> {
        self.checked_name(index)?;
        Ok(self.lock_for_read()[index].connection.clone())
    }

    /// Consistent copy of every slot, in index order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SlotView> {
        let slots = self.lock_for_read();
        self.names
            .iter()
            .zip(slots.iter())
            .enumerate()
            .map(|(index, (name, slot))| SlotView {
                index,
                name: name.clone(),
                connected: slot.connection.is_some(),
                last_status: slot.last_status.clone(),
                error_flag: slot.error_flag,
            })
            .collect()
    }

    /// Shuts down every live connection so each session observes EOF.
    ///
    /// Slots are left for their sessions to vacate.
    pub fn close_all(&self) -> usize {
        let handles: Vec<ConnectionHandle> = self
            .lock_for_read()
            .iter()
            .filter_map(|slot| slot.connection.clone())
            .collect();
        for handle in &handles {
            handle.close();
        }
        handles.len()
    }

    fn checked_name(&self, index: usize) -> Result<&str, RosterError> {
        self.name(index)
            .ok_or(RosterError::UnknownSlot { index })
    }

    fn lock_for_write(&self) -> Result<MutexGuard<'_, Vec<Slot>>, RosterError> {
        self.slots.lock().map_err(|_| RosterError::Poisoned)
    }

    fn lock_for_read(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn held_by(slot: &Slot, session: SessionId) -> bool {
    slot.connection
        .as_ref()
        .is_some_and(|handle| handle.session() == session)
}

/// Longest prefix of `payload` within [`STATUS_CAPACITY`] that ends on a
/// character boundary.
pub(crate) fn truncate_status(payload: &str) -> &str {
    if payload.len() <= STATUS_CAPACITY {
        return payload;
    }
    let mut end = STATUS_CAPACITY;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    &payload[..end]
}
