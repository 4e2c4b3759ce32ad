//! # warden-session - Tunnel Engine Session Management
//!
//! The stateful layer of Tunnel Warden: adapts the tunnel engine's four
//! asynchronous operations and two push-event channels behind a session
//! facade, and confirms requested transitions with a bounded probe
//! schedule.
//!
//! ## Public API
//!
//! ### Engine Surface (`engine`)
//! - [`TunnelEngine`] - The engine's start/stop/update/query operations
//! - [`EngineEvent`] - State ordinals and raw query-log payloads pushed by
//!   the engine
//!
//! ### Channels (`channel`)
//! - [`EventChannel`] - Explicit many-listener publish/subscribe channel
//! - [`Subscription`] - Idempotent unsubscribe handle, cancels on drop
//!
//! ### Session Facade (`facade`)
//! - [`SessionFacade`] - Compile-and-forward control calls, state mapping,
//!   listener fan-out, malformed-event tolerance
//!
//! ### Transition Confirmation (`confirm`)
//! - [`confirm_transition()`] - Bounded 300/900/1800 ms probe schedule
//! - [`ProbeOutcome`] - Settled, unsettled, or aborted-on-failure

pub mod channel;
pub mod confirm;
pub mod engine;
pub mod facade;

#[cfg(test)]
mod test_support;

pub use channel::{EventChannel, Subscription};
pub use confirm::{confirm_transition, ProbeOutcome, PROBE_DELAYS};
pub use engine::{EngineEvent, TunnelEngine};
pub use facade::SessionFacade;
