// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # benchlink State
//!
//! Runtime state for benchlink controllers: the parameter store and the
//! signal buffer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Parameter Store                   │  ← named typed values, dirty tracking
//! │   (single mutex, pull-based drain)  │
//! └─────────────────────────────────────┘
//! ┌─────────────────────────────────────┐
//! │   Signal Buffer                     │  ← bounded f32 rings, drop-oldest
//! │   (single mutex, flush per cycle)   │
//! └─────────────────────────────────────┘
//! ```
//!
//! Both stores are owned by the controller and shared behind `Arc` with the
//! device-facing thread and the sync channel. All operations are synchronous
//! and lock-only; nothing here blocks on I/O.
//!
//! ## Usage
//!
//! ```rust
//! use benchlink_state::{Constraint, ParameterStore, ParameterValue, SignalBuffer};
//!
//! let params = ParameterStore::new();
//! params.register(
//!     "gain",
//!     ParameterValue::Float(0.5),
//!     Constraint::Range { min: 0.0, max: 1.0 },
//! )?;
//!
//! let signals = SignalBuffer::new(16384);
//! signals.register("osc_ch1")?;
//! signals.append("osc_ch1", &[0.01, 0.02])?;
//! # Ok::<(), benchlink_state::StateError>(())
//! ```

pub mod parameter;
pub mod parameters;
pub mod signals;

// Re-exports
pub use parameter::{Constraint, ParameterKind, ParameterValue};
pub use parameters::{ChangeCallback, ParameterStore};
pub use signals::SignalBuffer;

/// State error types
#[derive(Debug, Clone)]
pub enum StateError {
    /// Name already registered
    DuplicateName(String),

    /// Parameter not found
    UnknownParameter(String),

    /// Value variant disagrees with the registered kind
    TypeMismatch {
        name: String,
        expected: ParameterKind,
        got: ParameterKind,
    },

    /// Value outside the declared constraint
    ConstraintViolation { name: String, reason: String },

    /// Signal not found
    UnknownSignal(String),

    /// Signal registered with zero capacity
    InvalidCapacity(String),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::DuplicateName(name) => write!(f, "Name already registered: {}", name),
            StateError::UnknownParameter(name) => write!(f, "Unknown parameter: {}", name),
            StateError::TypeMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "Type mismatch for '{}': expected {}, got {}",
                name, expected, got
            ),
            StateError::ConstraintViolation { name, reason } => {
                write!(f, "Constraint violation for '{}': {}", name, reason)
            }
            StateError::UnknownSignal(name) => write!(f, "Unknown signal: {}", name),
            StateError::InvalidCapacity(name) => {
                write!(f, "Signal '{}' capacity must be greater than 0", name)
            }
        }
    }
}

impl std::error::Error for StateError {}

pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StateError::TypeMismatch {
            name: "gain".to_string(),
            expected: ParameterKind::Float,
            got: ParameterKind::Str,
        };
        assert_eq!(err.to_string(), "Type mismatch for 'gain': expected float, got str");
    }
}
