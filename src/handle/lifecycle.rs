/*!
 * Handle Lifecycle
 */

use crate::core::guard::{GuardError, GuardResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Stage of a handle's life; only ever moves forward one step at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HandleState {
    Uninitialized = 0,
    Constructing = 1,
    Live = 2,
    Destroying = 3,
    Destroyed = 4,
}

impl HandleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleState::Uninitialized => "uninitialized",
            HandleState::Constructing => "constructing",
            HandleState::Live => "live",
            HandleState::Destroying => "destroying",
            HandleState::Destroyed => "destroyed",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => HandleState::Uninitialized,
            1 => HandleState::Constructing,
            2 => HandleState::Live,
            3 => HandleState::Destroying,
            _ => HandleState::Destroyed,
        }
    }

    fn successor(&self) -> Option<Self> {
        match self {
            HandleState::Uninitialized => Some(HandleState::Constructing),
            HandleState::Constructing => Some(HandleState::Live),
            HandleState::Live => Some(HandleState::Destroying),
            HandleState::Destroying => Some(HandleState::Destroyed),
            HandleState::Destroyed => None,
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomically updated [`HandleState`]
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub fn new() -> Self {
        Self(AtomicU8::new(HandleState::Uninitialized as u8))
    }

    #[inline]
    pub fn get(&self) -> HandleState {
        HandleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Step to `to`, which must directly follow the current state
    pub fn advance(&self, to: HandleState) -> GuardResult<()> {
        let from = self.get();
        if from.successor() != Some(to) {
            return Err(GuardError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| GuardError::InvalidTransition {
                from: HandleState::from_u8(actual).as_str(),
                to: to.as_str(),
            })
    }
}
