//! Statistics and metrics

pub mod metrics;

pub use metrics::{BrokerCounters, BrokerStats, ServerStats, SessionStats};
