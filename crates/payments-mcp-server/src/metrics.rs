use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::{LazyLock, Once};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Transport requests by verb and outcome
pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("mcp_requests_total", "Total number of /mcp requests"),
        &["method", "outcome"],
    )
    .unwrap()
});

// Session lifecycle
pub static SESSIONS_OPENED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("mcp_sessions_opened_total", "Total number of sessions opened").unwrap()
});

pub static SESSIONS_CLOSED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("mcp_sessions_closed_total", "Total number of sessions closed"),
        &["reason"],
    )
    .unwrap()
});

pub static ACTIVE_SESSIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("mcp_active_sessions", "Sessions currently registered").unwrap()
});

pub static OPEN_STREAMS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("mcp_open_streams", "Standing server-to-client streams").unwrap()
});

static REGISTER: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(REQUESTS_TOTAL.clone()),
            Box::new(SESSIONS_OPENED.clone()),
            Box::new(SESSIONS_CLOSED.clone()),
            Box::new(ACTIVE_SESSIONS.clone()),
            Box::new(OPEN_STREAMS.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::error!("Failed to register metric: {}", e);
            }
        }
    });
}
