//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Authentication Metrics
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gameportal_login_attempts_total", "Total number of GitHub login callbacks"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref SESSION_VALIDATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gameportal_session_validations_total", "Total number of session token validations"),
        &["result"]
    ).expect("metric can be created");
    pub static ref ADMINS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "gameportal_admins_created_total",
        "Total number of admin accounts created on first login"
    ).expect("metric can be created");
    pub static ref EXPIRED_SESSIONS_PURGED_TOTAL: IntCounter = IntCounter::new(
        "gameportal_expired_sessions_purged_total",
        "Total number of expired sessions removed by the cleanup task"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("gameportal_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(LOGIN_ATTEMPTS_TOTAL.clone()))
            .expect("LOGIN_ATTEMPTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(SESSION_VALIDATIONS_TOTAL.clone()))
            .expect("SESSION_VALIDATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ADMINS_CREATED_TOTAL.clone()))
            .expect("ADMINS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(EXPIRED_SESSIONS_PURGED_TOTAL.clone()))
            .expect("EXPIRED_SESSIONS_PURGED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record the outcome of a GitHub login callback.
pub fn record_login(outcome: &str) {
    LOGIN_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record the result of a session token validation.
pub fn record_session_validation(result: &str) {
    SESSION_VALIDATIONS_TOTAL.with_label_values(&[result]).inc();
}
