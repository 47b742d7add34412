use crate::state::messages::NetworkRequest;
use fest_api::sync::RUNNING_MATCHES_REFRESH;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Re-reads the running matches on a fixed period so the live banner and
/// the Live tab stay current without user input.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>) -> Self {
        Self { network_requests, period: RUNNING_MATCHES_REFRESH }
    }

    pub async fn run(self) {
        let mut running_interval = interval(self.period);
        // Startup already loads the running matches once.
        running_interval.tick().await;

        loop {
            running_interval.tick().await;
            if self
                .network_requests
                .send(NetworkRequest::RefreshRunning)
                .await
                .is_err()
            {
                break;
            }
        }
    }
}
