//! Shared test doubles for the session layer

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use warden_core::prelude::*;
use warden_core::{ConfigInput, RoutingConfig, RoutingMode, ServerConfig, TunnelProtocol};

use crate::engine::TunnelEngine;

/// One recorded engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start {
        server_name: String,
        config_text: String,
    },
    Stop,
    Update {
        server_name: Option<String>,
        config_text: Option<String>,
    },
    CurrentState,
}

/// Scripted engine double: records every call, plays back a state script,
/// and can hold `start` open on a gate to exercise the in-flight guard.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<EngineCall>>,
    pub state_script: Mutex<VecDeque<std::result::Result<i64, String>>>,
    pub fail_start: bool,
    pub start_gate: Option<Arc<Notify>>,
}

impl FakeEngine {
    /// Engine whose successive `current_state` calls yield `states`;
    /// once exhausted it reports ordinal 0.
    pub fn with_states(
        states: impl IntoIterator<Item = std::result::Result<i64, String>>,
    ) -> Self {
        Self {
            state_script: Mutex::new(states.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn state_query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::CurrentState))
            .count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TunnelEngine for FakeEngine {
    async fn start(&self, server_name: &str, config_text: &str) -> Result<()> {
        if let Some(gate) = &self.start_gate {
            gate.notified().await;
        }
        self.record(EngineCall::Start {
            server_name: server_name.to_string(),
            config_text: config_text.to_string(),
        });
        if self.fail_start {
            return Err(Error::engine("start refused"));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record(EngineCall::Stop);
        Ok(())
    }

    async fn update_configuration(
        &self,
        server_name: Option<&str>,
        config_text: Option<&str>,
    ) -> Result<()> {
        self.record(EngineCall::Update {
            server_name: server_name.map(str::to_string),
            config_text: config_text.map(str::to_string),
        });
        Ok(())
    }

    async fn current_state(&self) -> Result<i64> {
        self.record(EngineCall::CurrentState);
        match self.state_script.lock().unwrap().pop_front() {
            Some(Ok(ordinal)) => Ok(ordinal),
            Some(Err(message)) => Err(Error::engine(message)),
            None => Ok(0),
        }
    }
}

/// A representative selective-routing setup
pub fn sample_input() -> ConfigInput {
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
