// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Signal buffer - bounded append-only sample store per named signal
//!
//! Write-heavy: device sampling appends continuously, the sync channel
//! flushes per cycle. Overrun drops the oldest samples so a slow or absent
//! consumer sees the most recent window rather than drifting behind
//! real-time; drops are counted per signal for diagnostics, not surfaced as
//! errors.

use std::collections::VecDeque;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::{Result, StateError};

struct SignalEntry {
    samples: VecDeque<f32>,
    capacity: usize,
    dropped: u64,
}

/// Bounded ring buffers of `f32` samples, keyed by signal name
///
/// One mutex spans the registry: concurrent `append` and `flush` for the
/// same name never interleave into a corrupted sequence, and a flush sees a
/// consistent prefix of all samples appended before it took the lock.
pub struct SignalBuffer {
    entries: Mutex<AHashMap<String, SignalEntry>>,
    default_capacity: usize,
}

impl SignalBuffer {
    /// Create a buffer registry with the capacity used by [`register`](Self::register)
    pub fn new(default_capacity: usize) -> Self {
        Self {
            entries: Mutex::new(AHashMap::new()),
            default_capacity,
        }
    }

    /// Register a signal with the default capacity
    pub fn register(&self, name: &str) -> Result<()> {
        self.register_with_capacity(name, self.default_capacity)
    }

    /// Register a signal with an explicit ring capacity (samples)
    pub fn register_with_capacity(&self, name: &str, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(StateError::InvalidCapacity(name.to_string()));
        }

        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Err(StateError::DuplicateName(name.to_string()));
        }
        entries.insert(
            name.to_string(),
            SignalEntry {
                samples: VecDeque::with_capacity(capacity),
                capacity,
                dropped: 0,
            },
        );
        Ok(())
    }

    /// Append samples to the named signal
    ///
    /// Ring semantics: when capacity is exceeded the oldest samples are
    /// discarded and the per-signal dropped counter advances. Only an
    /// unregistered name is an error.
    pub fn append(&self, name: &str, samples: &[f32]) -> Result<()> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownSignal(name.to_string()))?;

        let mut dropped_now = 0u64;

        if samples.len() >= entry.capacity {
            // Incoming chunk alone fills the ring; keep its newest window
            dropped_now += entry.samples.len() as u64;
            dropped_now += (samples.len() - entry.capacity) as u64;
            entry.samples.clear();
            entry
                .samples
                .extend(&samples[samples.len() - entry.capacity..]);
        } else {
            let overflow = (entry.samples.len() + samples.len()).saturating_sub(entry.capacity);
            for _ in 0..overflow {
                entry.samples.pop_front();
            }
            dropped_now += overflow as u64;
            entry.samples.extend(samples);
        }

        if dropped_now > 0 {
            entry.dropped += dropped_now;
            trace!(
                "Signal '{}' overran capacity {}: dropped {} sample(s) (total {})",
                name,
                entry.capacity,
                dropped_now,
                entry.dropped
            );
        }
        Ok(())
    }

    /// Return and clear all buffered samples for a signal
    pub fn flush(&self, name: &str) -> Result<Vec<f32>> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownSignal(name.to_string()))?;
        Ok(std::mem::take(&mut entry.samples).into())
    }

    /// Flush every signal in one pass, returning only the non-empty ones
    ///
    /// Used by the sync channel per cycle; one lock acquisition for the
    /// whole sweep.
    pub fn flush_all(&self) -> Vec<(String, Vec<f32>)> {
        let mut entries = self.entries.lock();
        let mut out = Vec::new();
        for (name, entry) in entries.iter_mut() {
            if !entry.samples.is_empty() {
                out.push((name.clone(), std::mem::take(&mut entry.samples).into()));
            }
        }
        out
    }

    /// Cumulative count of samples discarded to overrun for a signal
    pub fn dropped(&self, name: &str) -> Result<u64> {
        let entries = self.entries.lock();
        entries
            .get(name)
            .map(|entry| entry.dropped)
            .ok_or_else(|| StateError::UnknownSignal(name.to_string()))
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

    /// Registered signal names
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}
