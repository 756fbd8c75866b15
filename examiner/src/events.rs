//! Diagnostic tracing for the harness itself.

use std::{collections::HashSet, fmt::Display};

use crate::trace_categories;
use tracing_subscriber::{Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// Category of harness events to trace.
#[derive(Clone, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum TraceEvent {
    /// Traces scope creation and hook registration.
    #[clap(name = "registry")]
    Registry,
    /// Traces run ordering, seeds and per-test outcomes.
    #[clap(name = "engine")]
    Engine,
    /// Traces arming and firing of the failure channel.
    #[clap(name = "failure")]
    Failure,
}

impl TraceEvent {
    const fn target(&self) -> &'static str {
        match self {
            Self::Registry => trace_categories::REGISTRY,
            Self::Engine => trace_categories::ENGINE,
            Self::Failure => trace_categories::FAILURE,
        }
    }
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.target())
    }
}

/// Tracing configuration installed at startup.
#[derive(Default)]
pub struct TraceEventConfig {
    enabled_trace_events: HashSet<TraceEvent>,
}

impl TraceEventConfig {
    /// Installs a stderr subscriber with the given categories enabled at DEBUG.
    pub fn init(enabled_log_events: &[TraceEvent]) -> Self {
        let config = Self {
            enabled_trace_events: enabled_log_events.iter().cloned().collect(),
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(config.compose_filter());

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            // A subscriber is already installed (e.g. by the embedding program).
            tracing::debug!("tracing subscriber already initialized");
        }

        config
    }

    fn compose_filter(&self) -> Targets {
        Targets::new()
            .with_default(tracing_subscriber::filter::LevelFilter::WARN)
            .with_targets(
                self.enabled_trace_events
                    .iter()
                    .map(|event| (event.target(), tracing::Level::DEBUG)),
            )
    }

    /// Returns the categories enabled at startup.
    pub const fn enabled_events(&self) -> &HashSet<TraceEvent> {
        &self.enabled_trace_events
    }
}
