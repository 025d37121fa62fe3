//! Bridge lifecycle state

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of the bridge session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BridgeState {
    /// Constructed, nothing exchanged yet
    Idle = 0,
    /// Observations and actions flowing
    Running = 1,
    /// Fatal desync; the bridge must be unloaded
    Disabled = 2,
}

impl BridgeState {
    fn from_u8(value: u8) -> BridgeState {
        match value {
            1 => BridgeState::Running,
            2 => BridgeState::Disabled,
            _ => BridgeState::Idle,
        }
    }
}

/// Shared, lock-free view of the bridge state
#[derive(Debug, Clone, Default)]
pub struct SharedBridgeState(Arc<AtomicU8>);

impl SharedBridgeState {
    pub fn new() -> SharedBridgeState {
        SharedBridgeState::default()
    }

    pub fn get(&self) -> BridgeState {
        BridgeState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: BridgeState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_state_round_trips() {
        let state = SharedBridgeState::new();
        assert_eq!(state.get(), BridgeState::Idle);
        state.set(BridgeState::Running);
        assert_eq!(state.clone().get(), BridgeState::Running);
        state.set(BridgeState::Disabled);
        assert_eq!(state.get(), BridgeState::Disabled);
    }
}
