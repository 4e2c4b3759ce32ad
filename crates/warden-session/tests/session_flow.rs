//! End-to-end session flow: compile-and-start, event fan-out, malformed
//! event tolerance, and transition confirmation against a scripted engine.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use warden_core::{
    ConfigInput, Error, QueryLogAction, QueryLogRow, Result, RoutingConfig, RoutingMode,
    ServerConfig, SessionState, TunnelProtocol,
};
use warden_session::{confirm_transition, EngineEvent, ProbeOutcome, SessionFacade, TunnelEngine};

/// Minimal scripted engine for the integration flow
#[derive(Default)]
struct FlowEngine {
    started: Mutex<Vec<(String, String)>>,
    stopped: Mutex<usize>,
    states: Mutex<VecDeque<i64>>,
}

impl FlowEngine {
    fn with_states(states: impl IntoIterator<Item = i64>) -> Self {
        Self {
            states: Mutex::new(states.into_iter().collect()),
            ..Self::default()
        }
    }
}

impl TunnelEngine for FlowEngine {
    async fn start(&self, server_name: &str, config_text: &str) -> Result<()> {
        self.started
            .lock()
            .unwrap()
            .push((server_name.to_string(), config_text.to_string()));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        *self.stopped.lock().unwrap() += 1;
        Ok(())
    }

    async fn update_configuration(
        &self,
        _server_name: Option<&str>,
        _config_text: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    async fn current_state(&self) -> Result<i64> {
        match self.states.lock().unwrap().pop_front() {
            Some(ordinal) => Ok(ordinal),
            None => Err(Error::engine("state script exhausted")),
        }
    }
}

fn selective_input() -> ConfigInput {
    ConfigInput {
        server: ServerConfig {
            name: "primary".to_string(),
            ip_address: "1.2.3.4".to_string(),
            domain: "vpn.example.org".to_string(),
            login: "user".to_string(),
            password: "secret".to_string(),
            protocol: TunnelProtocol::Quic,
            dns_servers: vec!["8.8.8.8:53".to_string()],
        },
        routing: RoutingConfig {
            mode: RoutingMode::Selective,
            rules: vec!["example.com".to_string()],
        },
        excluded_routes: vec![],
    }
}

/// Poll until `ready` holds or a bounded deadline passes.
async fn wait_until(ready: impl Fn() -> bool) {
    for _ in 0..200 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline");
}

#[tokio::test]
async fn start_pumps_events_and_tolerates_malformed_payloads() {
    let (tx, rx) = mpsc::channel(32);
    let facade = SessionFacade::new(FlowEngine::default(), rx);

    let seen_states: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_rows: Arc<Mutex<Vec<QueryLogRow>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_rows_b: Arc<Mutex<Vec<QueryLogRow>>> = Arc::new(Mutex::new(Vec::new()));

    let states_sink = Arc::clone(&seen_states);
    let _state_sub = facade.on_state(move |state| states_sink.lock().unwrap().push(*state));

    let rows_sink = Arc::clone(&seen_rows);
    let row_sub = facade.on_query_log(move |row| rows_sink.lock().unwrap().push(row.clone()));

    let rows_sink_b = Arc::clone(&seen_rows_b);
    let _row_sub_b =
        facade.on_query_log(move |row| rows_sink_b.lock().unwrap().push(row.clone()));

    // Start forwards the compiled config to the engine
    facade.start(&selective_input()).await.unwrap();
    {
        let started = facade.engine().started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0, "primary");
        assert!(started[0].1.contains("upstream_protocol = \"http3\""));
        assert!(started[0]
            .1
            .contains("exclusions = [\"example.com\", \"*.example.com\"]"));
    }

    // Engine pushes: state transitions, a valid row, garbage, another valid row
    tx.send(EngineEvent::State(1)).await.unwrap();
    tx.send(EngineEvent::State(2)).await.unwrap();
    tx.send(EngineEvent::QueryLog(
        r#"{"action":"tunnel","proto":"tcp","src":"10.0.0.2","date":"2024-01-01T00:00:00Z"}"#
            .to_string(),
    ))
    .await
    .unwrap();
    tx.send(EngineEvent::QueryLog("{malformed".to_string()))
        .await
        .unwrap();
    tx.send(EngineEvent::QueryLog(
        r#"{"action":"BYPASS","proto":"udp","src":"10.0.0.3","dst":"8.8.8.8:53","date":"2024-01-01T00:00:01Z"}"#
            .to_string(),
    ))
    .await
    .unwrap();

    wait_until(|| seen_rows.lock().unwrap().len() == 2).await;
    wait_until(|| seen_states.lock().unwrap().len() == 2).await;

    // State notifications arrive mapped, in emission order
    assert_eq!(
        *seen_states.lock().unwrap(),
        vec![SessionState::Connecting, SessionState::Connected]
    );
    assert_eq!(facade.last_observed_state(), SessionState::Connected);

    // The malformed payload was dropped; the pipeline kept going
    {
        let rows = seen_rows.lock().unwrap();
        assert_eq!(rows[0].action, QueryLogAction::Tunnel);
        assert_eq!(rows[0].destination, None);
        assert_eq!(rows[1].action, QueryLogAction::Bypass);
        assert_eq!(rows[1].destination.as_deref(), Some("8.8.8.8:53"));
    }
    // Both listeners saw the same rows independently
    assert_eq!(*seen_rows_b.lock().unwrap(), *seen_rows.lock().unwrap());

    // Unsubscribing is idempotent and stops delivery for that listener only
    row_sub.cancel();
    row_sub.cancel();
    tx.send(EngineEvent::QueryLog(
        r#"{"action":"reject","proto":"tcp","src":"10.0.0.4","date":"2024-01-01T00:00:02Z"}"#
            .to_string(),
    ))
    .await
    .unwrap();
    wait_until(|| seen_rows_b.lock().unwrap().len() == 3).await;
    assert_eq!(seen_rows.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn stop_then_confirmation_settles_disconnected() {
    let (_tx, rx) = mpsc::channel(32);
    let facade = SessionFacade::new(FlowEngine::with_states([0]), rx);

    facade.stop().await.unwrap();
    assert_eq!(*facade.engine().stopped.lock().unwrap(), 1);

    let outcome = confirm_transition(&facade, "after disconnect").await;
    assert!(matches!(
        outcome,
        ProbeOutcome::Settled(SessionState::Disconnected)
    ));
}

#[tokio::test]
async fn confirmation_failure_reports_probe_error() {
    let (_tx, rx) = mpsc::channel(32);
    // Script exhausted immediately: first probe fails
    let facade = SessionFacade::new(FlowEngine::with_states(Vec::<i64>::new()), rx);

    let outcome = confirm_transition(&facade, "after connect").await;
    match outcome {
        ProbeOutcome::Failed(err) => assert!(matches!(err, Error::Probe { .. })),
        other => panic!("expected Failed outcome, got {other:?}"),
    }
}
