//! Transition confirmation protocol
//!
//! After a session-mutating request the engine settles asynchronously; this
//! bounded probe schedule shortens the time a caller waits to observe the
//! settled state. It never mutates authoritative state and never retries
//! the mutating call -- each probe is a plain state query.

use std::time::Duration;

use warden_core::prelude::*;
use warden_core::{Error, SessionState};

use crate::engine::TunnelEngine;
use crate::facade::SessionFacade;

/// Probe schedule after a state-changing request
pub const PROBE_DELAYS: [Duration; 3] = [
    Duration::from_millis(300),
    Duration::from_millis(900),
    Duration::from_millis(1800),
];

/// How a confirmation run ended
#[derive(Debug)]
pub enum ProbeOutcome {
    /// A probe observed a settled state (connected or disconnected)
    Settled(SessionState),

    /// The schedule ran out without the state settling
    Unsettled(SessionState),

    /// A state query failed; the remaining schedule was abandoned
    Failed(Error),
}

impl ProbeOutcome {
    /// Whether the run observed a settled state.
    pub fn is_settled(&self) -> bool {
        matches!(self, ProbeOutcome::Settled(_))
    }

    /// The last observed state, if any probe succeeded.
    pub fn state(&self) -> Option<SessionState> {
        match self {
            ProbeOutcome::Settled(state) | ProbeOutcome::Unsettled(state) => Some(*state),
            ProbeOutcome::Failed(_) => None,
        }
    }
}

/// Poll the engine until the session state settles or the probe budget is
/// exhausted.
///
/// Waits 300 ms, queries; stops on `connected`/`disconnected`. Otherwise
/// waits 900 ms and queries again, then 1800 ms for a final query. Any
/// query failure aborts the remaining schedule immediately -- the query
/// itself is not retried. Observations are reported through the logging
/// channel consumers already observe; `reason` tags them.
pub async fn confirm_transition<E: TunnelEngine>(
    facade: &SessionFacade<E>,
    reason: &str,
) -> ProbeOutcome {
    let mut last_observed = facade.last_observed_state();

    for delay in PROBE_DELAYS {
        tokio::time::sleep(delay).await;

        match facade.current_state().await {
            Ok(state) => {
                info!("State probe ({reason}): {state}.");
                last_observed = state;
                if state.is_settled() {
                    return ProbeOutcome::Settled(state);
                }
            }
            Err(err) => {
                warn!("State probe failed ({reason}): {err}");
                return ProbeOutcome::Failed(Error::probe(err.to_string()));
            }
        }
    }

    info!("State probes exhausted ({reason}), last state: {last_observed}.");
    ProbeOutcome::Unsettled(last_observed)
}
