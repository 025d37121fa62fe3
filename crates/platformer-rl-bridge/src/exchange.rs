//! Bounded observation/reward/action channels with desync detection
//!
//! Each channel has exactly one producer role and one consumer role. The
//! simulation side pushes observations and rewards (dropped silently when
//! training is disabled, backpressured otherwise) and pulls actions with a
//! fail-fast timeout. Counters on both sides make request/sent mismatches
//! observable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use platformer_rl_core::{Action, BridgeConfig, BridgeError, Observation, Result, Reward};
use tracing::{error, warn};

use crate::state::{BridgeState, SharedBridgeState};

#[derive(Debug, Default)]
struct Counters {
    observations_sent: AtomicU64,
    actions_requested: AtomicU64,
}

/// Simulation-thread end of the exchange: produces observations and
/// rewards, consumes actions.
pub struct SimEndpoint {
    observation_tx: SyncSender<Observation>,
    reward_tx: SyncSender<Reward>,
    action_rx: Receiver<Action>,
    counters: Arc<Counters>,
    state: SharedBridgeState,
    training_enabled: bool,
    action_timeout: Duration,
    tick_budget_ms: f64,
}

/// Agent-thread end of the exchange: consumes observations and rewards,
/// produces actions.
pub struct AgentEndpoint {
    observation_rx: Receiver<Observation>,
    reward_rx: Receiver<Reward>,
    action_tx: SyncSender<Action>,
    counters: Arc<Counters>,
    state: SharedBridgeState,
}

/// Constructor for the channel pair
pub struct Exchange;

impl Exchange {
    pub fn new(config: &BridgeConfig) -> (SimEndpoint, AgentEndpoint) {
        let (observation_tx, observation_rx) = sync_channel(config.channel_capacity);
        let (reward_tx, reward_rx) = sync_channel(config.channel_capacity);
        let (action_tx, action_rx) = sync_channel(config.channel_capacity);
        let counters = Arc::new(Counters::default());
        let state = SharedBridgeState::new();

        let sim = SimEndpoint {
            observation_tx,
            reward_tx,
            action_rx,
            counters: Arc::clone(&counters),
            state: state.clone(),
            training_enabled: config.training_enabled,
            action_timeout: config.action_timeout(),
            tick_budget_ms: config.tick_budget_ms(),
        };
        let agent = AgentEndpoint {
            observation_rx,
            reward_rx,
            action_tx,
            counters,
            state,
        };
        (sim, agent)
    }
}

impl SimEndpoint {
    pub fn state(&self) -> BridgeState {
        self.state.get()
    }

    pub fn mark_running(&self) {
        if self.state.get() == BridgeState::Idle {
            self.state.set(BridgeState::Running);
        }
    }

    /// Push an observation. With training disabled the push never blocks
    /// and a full queue drops the observation silently.
    pub fn push_observation(&self, observation: Observation) -> Result<()> {
        if !self.training_enabled {
            if let Err(TrySendError::Disconnected(_)) =
                self.observation_tx.try_send(observation)
            {
                return Err(BridgeError::ChannelClosed("observation"));
            }
            return Ok(());
        }
        self.observation_tx
            .send(observation)
            .map_err(|_| BridgeError::ChannelClosed("observation"))
    }

    /// Push a reward, same policy as observations
    pub fn push_reward(&self, reward: Reward) -> Result<()> {
        if !self.training_enabled {
            if let Err(TrySendError::Disconnected(_)) = self.reward_tx.try_send(reward) {
                return Err(BridgeError::ChannelClosed("reward"));
            }
            return Ok(());
        }
        self.reward_tx
            .send(reward)
            .map_err(|_| BridgeError::ChannelClosed("reward"))
    }

    /// Block until the agent produces an action or the timeout elapses.
    /// A timeout is a fatal desync: logged once, the bridge is disabled,
    /// and the caller must unload the session.
    pub fn next_action(&self) -> Result<Action> {
        let requested = self.counters.actions_requested.fetch_add(1, Ordering::AcqRel) + 1;
        let sent = self.counters.observations_sent.load(Ordering::Acquire);
        if requested > sent {
            warn!(requested, sent, "more actions requested than observations sent");
        }

        let start = Instant::now();
        let action = match self.action_rx.recv_timeout(self.action_timeout) {
            Ok(action) => action,
            Err(RecvTimeoutError::Timeout) => {
                let waited_ms = start.elapsed().as_millis() as u64;
                error!(waited_ms, "action retrieval timed out; disabling bridge");
                self.state.set(BridgeState::Disabled);
                return Err(BridgeError::ActionTimeout { waited_ms });
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.state.set(BridgeState::Disabled);
                return Err(BridgeError::ChannelClosed("action"));
            }
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if elapsed_ms > self.tick_budget_ms {
            warn!(
                overage_ms = elapsed_ms - self.tick_budget_ms,
                budget_ms = self.tick_budget_ms,
                "action retrieval exceeded the per-tick budget"
            );
        }
        Ok(action)
    }

    /// Drain stale actions left over from a finished episode
    pub fn flush_actions(&self) {
        let mut drained = 0usize;
        while self.action_rx.try_recv().is_ok() {
            drained += 1;
        }
        if drained > 0 {
            warn!(drained, "flushed stale actions from the queue");
        }
    }
}

impl AgentEndpoint {
    pub fn state(&self) -> BridgeState {
        self.state.get()
    }

    /// Block until the next observation arrives, counting it as sent
    pub fn next_observation(&self) -> Result<Observation> {
        let observation = self
            .observation_rx
            .recv()
            .map_err(|_| BridgeError::ChannelClosed("observation"))?;
        self.counters.observations_sent.fetch_add(1, Ordering::AcqRel);
        Ok(observation)
    }

    /// Non-blocking observation poll used by agents that interleave work
    pub fn try_next_observation(&self) -> Option<Observation> {
        let observation = self.observation_rx.try_recv().ok()?;
        self.counters.observations_sent.fetch_add(1, Ordering::AcqRel);
        Some(observation)
    }

    /// Block until the next reward arrives
    pub fn next_reward(&self) -> Result<Reward> {
        self.reward_rx
            .recv()
            .map_err(|_| BridgeError::ChannelClosed("reward"))
    }

    pub fn try_next_reward(&self) -> Option<Reward> {
        self.reward_rx.try_recv().ok()
    }

    /// Push an action for the simulation thread to apply
    pub fn push_action(&self, action: Action) -> Result<()> {
        self.action_tx
            .send(action)
            .map_err(|_| BridgeError::ChannelClosed("action"))
    }
}
