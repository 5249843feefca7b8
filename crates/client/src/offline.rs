//! Connectivity tracking.
//!
//! The client never probes the service on its own; it records what the last
//! remote call told it.

use crate::api::ApiError;

// Re-export from shared types module
pub use crate::types::ConnectivityState;

/// Last observed connectivity and the error that caused an offline state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    state: ConnectivityState,
    last_error: Option<ApiError>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity {
    /// Starts online; nothing has failed yet.
    pub fn new() -> Self {
        Self {
            state: ConnectivityState::Online,
            last_error: None,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn is_offline(&self) -> bool {
        self.state == ConnectivityState::Offline
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// The service answered with a 2xx.
    pub fn record_success(&mut self) {
        if self.is_offline() {
            tracing::info!("reports service reachable again");
        }
        self.state = ConnectivityState::Online;
        self.last_error = None;
    }

    /// A call failed. Only transport failures switch to offline; an error
    /// status still proves the service is reachable.
    pub fn record_failure(&mut self, err: &ApiError) {
        if err.is_network() {
            if !self.is_offline() {
                tracing::warn!("reports service unreachable: {err}");
            }
            self.state = ConnectivityState::Offline;
        } else {
            self.state = ConnectivityState::Online;
        }
        self.last_error = Some(err.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_go_offline() {
        let mut c = Connectivity::new();
        assert_eq!(c.state(), ConnectivityState::Online);

        c.record_failure(&ApiError::Api {
            status: 500,
            message: "boom".into(),
        });
        assert!(!c.is_offline());
        assert!(c.last_error().is_some());

        c.record_failure(&ApiError::Network("connection refused".into()));
        assert!(c.is_offline());

        c.record_success();
        assert_eq!(c.state(), ConnectivityState::Online);
        assert!(c.last_error().is_none());
    }
}
