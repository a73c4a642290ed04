//! Application state for the web server.

use std::sync::Arc;
use std::time::Duration;

use rookery::Dashboard;

use super::error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Dataset, profile, pipeline and reference sample, loaded once.
    pub dashboard: Arc<Dashboard>,
    /// Upper bound on one request's blocking work.
    pub request_timeout: Duration,
}

impl AppState {
    /// Create new application state.
    pub fn new(dashboard: Dashboard) -> Self {
        let request_timeout = Duration::from_secs(dashboard.config().server.request_timeout_secs);
        Self {
            dashboard: Arc::new(dashboard),
            request_timeout,
        }
    }

    /// Run CPU-bound work off the async workers, bounded by the request timeout.
    ///
    /// On timeout the response is sent immediately; the blocking task runs to
    /// completion in the background and its result is dropped.
    pub async fn run_blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Dashboard) -> T + Send + 'static,
        T: Send + 'static,
    {
        let dashboard = Arc::clone(&self.dashboard);
        let task = tokio::task::spawn_blocking(move || work(&dashboard));

        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ApiError::Internal(format!("Request task failed: {}", e))),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.request_timeout.as_secs(),
                    "request timed out"
                );
                Err(ApiError::Timeout(self.request_timeout))
            }
        }
    }
}
