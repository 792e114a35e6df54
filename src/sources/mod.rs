//! Evidence sources: where the pipeline reads raw log lines and metric events from.

pub mod file;
pub mod synthetic;

use anyhow::Result;

use crate::triage::MetricEvent;

pub use self::file::FileSources;

pub const DEFAULT_LOG_LIMIT: usize = 500;
pub const DEFAULT_METRIC_LIMIT: usize = 120;

/// Recent raw log lines for a service.
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    /// At most `limit` of the most recent lines, most-recent-last.
    /// An unknown service yields an empty list, not an error.
    async fn fetch_logs(&self, service: &str, limit: usize) -> Result<Vec<String>>;
}

/// Recent metric events for a service.
#[async_trait::async_trait]
pub trait MetricSource: Send + Sync {
    /// At most `limit` of the most recent events, in chronological order.
    /// An unknown service yields an empty list, not an error.
    async fn fetch_metrics(&self, service: &str, limit: usize) -> Result<Vec<MetricEvent>>;
}

/// Whether `service` is safe to use as a file stem.
pub fn is_valid_service_name(service: &str) -> bool {
    !service.is_empty()
        && !service.starts_with('.')
        && service
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert!(is_valid_service_name("orders-api"));
        assert!(is_valid_service_name("billing_v2.internal"));
        assert!(!is_valid_service_name(""));
        assert!(!is_valid_service_name("../etc/passwd"));
        assert!(!is_valid_service_name(".hidden"));
        assert!(!is_valid_service_name("a/b"));
    }
}
