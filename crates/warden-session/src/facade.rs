//! Session facade over the tunnel engine
//!
//! Owns the canonical ordinal-to-state mapping, the two listener channels,
//! and the background pump that turns raw engine events into typed
//! notifications. Control calls compile the structured config and forward
//! it; waiting for the resulting transition is the confirmation protocol's
//! job, triggered by the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use warden_core::prelude::*;
use warden_core::{compile, decode_query_log_row, ConfigInput, QueryLogRow, SessionState};

use crate::channel::{EventChannel, Subscription};
use crate::engine::{EngineEvent, TunnelEngine};

/// Stateful adapter over the engine's four operations and two push channels.
///
/// The facade holds no cross-call invariant beyond "the last value returned
/// by [`current_state`](Self::current_state) or delivered via
/// [`on_state`](Self::on_state) is authoritative until superseded".
/// Overlapping mutating calls are rejected with
/// [`Error::TransitionInFlight`] instead of racing the engine.
pub struct SessionFacade<E: TunnelEngine> {
    engine: E,
    state_channel: EventChannel<SessionState>,
    query_log_channel: EventChannel<QueryLogRow>,
    last_state: Arc<Mutex<SessionState>>,
    in_flight: AtomicBool,
}

impl<E: TunnelEngine> SessionFacade<E> {
    /// Create a facade over `engine`, consuming its push-event stream.
    ///
    /// Spawns the event pump; it runs until the event stream closes.
    pub fn new(engine: E, events: mpsc::Receiver<EngineEvent>) -> Self {
        let state_channel = EventChannel::new();
        let query_log_channel = EventChannel::new();
        let last_state = Arc::new(Mutex::new(SessionState::Disconnected));

        tokio::spawn(pump_events(
            events,
            state_channel.clone(),
            query_log_channel.clone(),
            Arc::clone(&last_state),
        ));

        Self {
            engine,
            state_channel,
            query_log_channel,
            last_state,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Access the underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Compile `input` and ask the engine to start a session.
    ///
    /// Does not wait for the resulting state transition; trigger
    /// [`confirm_transition`](crate::confirm_transition) for that.
    pub async fn start(&self, input: &ConfigInput) -> Result<()> {
        let _guard = self.begin_transition()?;
        let config_text = compile(input);
        debug!(
            server = %input.server.name,
            bytes = config_text.len(),
            "Starting tunnel session"
        );
        self.engine.start(&input.server.name, &config_text).await
    }

    /// Ask the engine to tear down the active session.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.begin_transition()?;
        debug!("Stopping tunnel session");
        self.engine.stop().await
    }

    /// Replace the active session's configuration, or re-apply the engine's
    /// current one when `input` is absent.
    pub async fn update_configuration(&self, input: Option<&ConfigInput>) -> Result<()> {
        let _guard = self.begin_transition()?;
        match input {
            Some(input) => {
                let config_text = compile(input);
                debug!(server = %input.server.name, "Updating tunnel configuration");
                self.engine
                    .update_configuration(Some(&input.server.name), Some(&config_text))
                    .await
            }
            None => {
                debug!("Re-applying current tunnel configuration");
                self.engine.update_configuration(None, None).await
            }
        }
    }

    /// Query the engine and map its ordinal through the total state table.
    ///
    /// A query issued concurrently with an in-flight `start` may race and
    /// return a stale value; callers needing freshness use the
    /// confirmation protocol.
    pub async fn current_state(&self) -> Result<SessionState> {
        let ordinal = self.engine.current_state().await?;
        let state = SessionState::from_ordinal(ordinal);
        *self.last_state.lock().expect("state lock poisoned") = state;
        Ok(state)
    }

    /// The last state returned by a query or delivered by the engine.
    pub fn last_observed_state(&self) -> SessionState {
        *self.last_state.lock().expect("state lock poisoned")
    }

    /// Register a session-state listener.
    pub fn on_state(
        &self,
        listener: impl Fn(&SessionState) + Send + Sync + 'static,
    ) -> Subscription<SessionState> {
        self.state_channel.subscribe(listener)
    }

    /// Register a query-log listener. Only payloads that decode cleanly are
    /// delivered; malformed ones are dropped with a diagnostic.
    pub fn on_query_log(
        &self,
        listener: impl Fn(&QueryLogRow) + Send + Sync + 'static,
    ) -> Subscription<QueryLogRow> {
        self.query_log_channel.subscribe(listener)
    }

    /// Compare-and-swap in-flight guard for session-mutating calls.
    fn begin_transition(&self) -> Result<InFlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejecting overlapping session-mutating call");
            return Err(Error::TransitionInFlight);
        }
        Ok(InFlightGuard {
            flag: &self.in_flight,
        })
    }
}

/// Clears the in-flight flag when the mutating call completes or fails.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Background task: turn raw engine events into typed notifications.
///
/// Decode failures drop the single offending event and keep the pipeline
/// running; listener callbacks never see a partial record.
async fn pump_events(
    mut events: mpsc::Receiver<EngineEvent>,
    state_channel: EventChannel<SessionState>,
    query_log_channel: EventChannel<QueryLogRow>,
    last_state: Arc<Mutex<SessionState>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::State(ordinal) => {
                let state = SessionState::from_ordinal(ordinal);
                trace!("Engine state notification: {ordinal} -> {state}");
                *last_state.lock().expect("state lock poisoned") = state;
                state_channel.emit(&state);
            }
            EngineEvent::QueryLog(raw) => match decode_query_log_row(&raw) {
                Ok(row) => query_log_channel.emit(&row),
                Err(err) => {
                    warn!("Dropping malformed query log event: {err}");
                }
            },
        }
    }

    debug!("Engine event stream closed, pump finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_input, EngineCall, FakeEngine};
    use tokio::sync::Notify;

    fn facade_with(engine: FakeEngine) -> SessionFacade<FakeEngine> {
        let (_tx, rx) = mpsc::channel(16);
        SessionFacade::new(engine, rx)
    }

    #[tokio::test]
    async fn test_start_compiles_and_forwards() {
        let facade = facade_with(FakeEngine::default());

        facade.start(&sample_input()).await.unwrap();

        let calls = facade.engine().calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            EngineCall::Start {
                server_name,
                config_text,
            } => {
                assert_eq!(server_name, "primary");
                assert!(config_text.contains("upstream_protocol = \"http3\""));
                assert!(config_text.contains("addresses = [\"1.2.3.4:443\"]"));
            }
            other => panic!("expected Start call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_configuration_with_and_without_input() {
        let facade = facade_with(FakeEngine::default());

        facade
            .update_configuration(Some(&sample_input()))
            .await
            .unwrap();
        facade.update_configuration(None).await.unwrap();

        let calls = facade.engine().calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            EngineCall::Update {
                server_name,
                config_text,
            } => {
                assert_eq!(server_name.as_deref(), Some("primary"));
                assert!(config_text.as_deref().unwrap().contains("[endpoint]"));
            }
            other => panic!("expected Update call, got {other:?}"),
        }
        assert_eq!(
            calls[1],
            EngineCall::Update {
                server_name: None,
                config_text: None,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_start_propagates_and_leaves_state() {
        let engine = FakeEngine {
            fail_start: true,
            ..FakeEngine::default()
        };
        let facade = facade_with(engine);

        let err = facade.start(&sample_input()).await.unwrap_err();
        assert!(matches!(err, Error::Engine { .. }));
        assert_eq!(facade.last_observed_state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_current_state_maps_ordinal() {
        let engine = FakeEngine::with_states([Ok(2), Ok(42)]);
        let facade = facade_with(engine);

        assert_eq!(
            facade.current_state().await.unwrap(),
            SessionState::Connected
        );
        assert_eq!(facade.last_observed_state(), SessionState::Connected);

        // Unknown ordinal never surfaces an unrecognized state
        assert_eq!(
            facade.current_state().await.unwrap(),
            SessionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_overlapping_mutating_calls_rejected() {
        let gate = Arc::new(Notify::new());
        let engine = FakeEngine {
            start_gate: Some(Arc::clone(&gate)),
            ..FakeEngine::default()
        };
        let (_tx, rx) = mpsc::channel(16);
        let facade = Arc::new(SessionFacade::new(engine, rx));

        let first = {
            let facade = Arc::clone(&facade);
            tokio::spawn(async move { facade.start(&sample_input()).await })
        };
        tokio::task::yield_now().await;

        // Second mutating call while the first is still in flight
        let err = facade.stop().await.unwrap_err();
        assert!(matches!(err, Error::TransitionInFlight));

        gate.notify_one();
        first.await.unwrap().unwrap();

        // Guard released after completion
        facade.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_guard_released_after_failure() {
        let engine = FakeEngine {
            fail_start: true,
            ..FakeEngine::default()
        };
        let facade = facade_with(engine);

        assert!(facade.start(&sample_input()).await.is_err());
        // A failed call must not leave the guard held
        assert!(facade.stop().await.is_ok());
    }
}
