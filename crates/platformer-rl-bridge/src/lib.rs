//! # platformer-rl-bridge
//!
//! Three independent bounded channels connect the simulation thread to the
//! external agent: observations and rewards flow out, actions flow in. The
//! simulation side's only blocking call is the action fetch, which is
//! bounded by a timeout; exceeding it is an unrecoverable desync that
//! disables the bridge.

pub mod exchange;
pub mod state;

pub use exchange::{AgentEndpoint, Exchange, SimEndpoint};
pub use state::BridgeState;
