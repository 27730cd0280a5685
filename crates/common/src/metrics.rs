//! Process-wide Prometheus registry and the counters recorded by the service layer.

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Xero OAuth callbacks by outcome (`connected`, `invalid_state`, `token_exchange_failed`, ...).
pub static XERO_CALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register(IntCounterVec::new(
        Opts::new("xero_callbacks_total", "Xero OAuth callbacks by outcome"),
        &["outcome"],
    ))
});

/// Remote bank accounts seen during matching, labelled `matched` / `unmatched`.
pub static XERO_ACCOUNT_MATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register(IntCounterVec::new(
        Opts::new("xero_account_matches_total", "Xero bank accounts by auto-match result"),
        &["result"],
    ))
});

/// Transactions processed by Xero sync, labelled `imported` / `skipped` / `failed`.
pub static XERO_SYNC_TRANSACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register(IntCounterVec::new(
        Opts::new("xero_sync_transactions_total", "Transactions processed by Xero sync"),
        &["result"],
    ))
});

/// Chat completions by outcome (`ok` / `error`).
pub static CHAT_COMPLETIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register(IntCounterVec::new(
        Opts::new("chat_completions_total", "AI chat completions by outcome"),
        &["outcome"],
    ))
});

fn register(counter: prometheus::Result<IntCounterVec>) -> IntCounterVec {
    // 指标定义为静态常量，名称与标签固定，构造失败属于编程错误
    let counter = counter.expect("valid metric definition");
    if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
        tracing::warn!(error = %e, "metric already registered");
    }
    counter
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> (StatusCode, String) {
    Lazy::force(&XERO_CALLBACKS);
    Lazy::force(&XERO_ACCOUNT_MATCHES);
    Lazy::force(&XERO_SYNC_TRANSACTIONS);
    Lazy::force(&CHAT_COMPLETIONS);

    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    match encoder.encode(&REGISTRY.gather(), &mut buf) {
        Ok(()) => (StatusCode::OK, String::from_utf8_lossy(&buf).into_owned()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_render() {
        XERO_CALLBACKS.with_label_values(&["connected"]).inc();
        let (status, body) = render();
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("xero_callbacks_total"));
        assert!(body.contains("outcome=\"connected\""));
    }
}
