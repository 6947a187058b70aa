// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parameter store - named, typed, change-tracked controller state
//!
//! One mutex spans the whole registry, making every operation atomic with
//! respect to [`ParameterStore::drain_changes`]: a concurrent `set` is either
//! fully included in a drain or deferred entirely to the next one.

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::parameter::{Constraint, ParameterKind, ParameterValue};
use crate::{Result, StateError};

/// Device-side reaction hook, fired when a peer write is accepted
pub type ChangeCallback = Box<dyn Fn(&str, &ParameterValue) + Send + Sync>;

struct ParameterEntry {
    value: ParameterValue,
    kind: ParameterKind,
    constraint: Constraint,
    /// Value diverges from the last value handed to the sync channel
    dirty: bool,
}

/// Thread-safe registry mapping names to typed values, with change tracking
///
/// Registered once at controller initialization; mutated by device-facing
/// logic ([`set`](Self::set)) or by inbound UI messages
/// ([`apply_peer`](Self::apply_peer)); entries live until controller
/// teardown.
#[derive(Default)]
pub struct ParameterStore {
    entries: Mutex<AHashMap<String, ParameterEntry>>,
    on_change: RwLock<Option<ChangeCallback>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter with its initial value and constraint
    ///
    /// The entry starts dirty: nothing has been transmitted yet, so the
    /// initial value reaches the peer on the first sync cycle.
    pub fn register(
        &self,
        name: &str,
        initial_value: ParameterValue,
        constraint: Constraint,
    ) -> Result<()> {
        constraint
            .check(&initial_value)
            .map_err(|reason| StateError::ConstraintViolation {
                name: name.to_string(),
                reason,
            })?;

        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Err(StateError::DuplicateName(name.to_string()));
        }

        let kind = initial_value.kind();
        entries.insert(
            name.to_string(),
            ParameterEntry {
                value: initial_value,
                kind,
                constraint,
                dirty: true,
            },
        );
        Ok(())
    }

    /// Set a parameter from device-facing code
    ///
    /// Marks the entry dirty on success. Notification is pull-based: the sync
    /// channel picks the change up on its next [`drain_changes`](Self::drain_changes).
    pub fn set(&self, name: &str, value: ParameterValue) -> Result<()> {
        self.write(name, value, true)?;
        Ok(())
    }

    /// Apply a parameter update received from the peer
    ///
    /// Identical validation to [`set`](Self::set), but the entry is left
    /// clean - the peer already holds the value it sent, so accepted UI
    /// edits are not echoed back. Fires the registered change callback after
    /// the store lock is released; the callback may itself call `set`.
    ///
    /// Conflict policy is last-write-wins: whichever of `set`/`apply_peer`
    /// takes the lock later determines both the value and the dirty flag.
    pub fn apply_peer(&self, name: &str, value: ParameterValue) -> Result<()> {
        let applied = self.write(name, value, false)?;

        let callback = self.on_change.read();
        if let Some(cb) = callback.as_ref() {
            cb(name, &applied);
        }
        Ok(())
    }

    fn write(&self, name: &str, value: ParameterValue, mark_dirty: bool) -> Result<ParameterValue> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownParameter(name.to_string()))?;

        if value.kind() != entry.kind {
            return Err(StateError::TypeMismatch {
                name: name.to_string(),
                expected: entry.kind,
                got: value.kind(),
            });
        }

        if let Err(reason) = entry.constraint.check(&value) {
            return Err(StateError::ConstraintViolation {
                name: name.to_string(),
                reason,
            });
        }

        entry.value = value.clone();
        entry.dirty = mark_dirty;
        Ok(value)
    }

    /// Current value of a parameter
    pub fn get(&self, name: &str) -> Result<ParameterValue> {
        let entries = self.entries.lock();
        entries
            .get(name)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| StateError::UnknownParameter(name.to_string()))
    }

    /// Atomically take all pending changes and clear their dirty flags
    ///
    /// Returns the latest value per changed name - intermediate values
    /// between two drains coalesce. Used exclusively by the sync channel.
    pub fn drain_changes(&self) -> Vec<(String, ParameterValue)> {
        let mut entries = self.entries.lock();
        let mut changes = Vec::new();
        for (name, entry) in entries.iter_mut() {
            if entry.dirty {
                entry.dirty = false;
                changes.push((name.clone(), entry.value.clone()));
            }
        }
        if !changes.is_empty() {
            debug!("Drained {} parameter change(s)", changes.len());
        }
        changes
    }

    /// Kind a name was registered with, for inbound JSON decoding
    pub fn kind_of(&self, name: &str) -> Result<ParameterKind> {
        let entries = self.entries.lock();
        entries
            .get(name)
            .map(|entry| entry.kind)
            .ok_or_else(|| StateError::UnknownParameter(name.to_string()))
    }

    /// Register the device-side reaction hook fired by [`apply_peer`](Self::apply_peer)
    ///
    /// A later registration replaces the previous one.
    pub fn on_change(&self, callback: ChangeCallback) {
        *self.on_change.write() = Some(callback);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Registered parameter names
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}
