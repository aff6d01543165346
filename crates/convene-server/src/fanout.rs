//! Concurrent delivery of a join notification to every connection of a group.
//!
//! Deliveries are independent: each one resolves to success or a
//! [`DeliveryFailure`], and the fanout completes once all of them have.
//! Failures are logged and counted, never propagated.

use std::sync::Arc;
use std::time::Instant;

use convene_core::wire::UserJoined;
use convene_core::{ConnectionId, GroupId, UserId};
use convene_store::ConnectionRegistry;
use futures::future::join_all;
use metrics::{counter, histogram};
use tracing::{debug, error, warn};

use crate::delivery::{DeliveryError, Transport};
use crate::metrics::{DELIVERIES_TOTAL, FANOUT_DURATION_SECONDS};

/// One connection that did not receive the notification.
#[derive(Debug)]
pub struct DeliveryFailure {
    /// Target connection.
    pub connection_id: ConnectionId,
    /// What went wrong.
    pub error: DeliveryError,
}

/// Outcome of one fanout.
#[derive(Debug, Default)]
pub struct FanoutReport {
    /// Connections a delivery was attempted to.
    pub attempted: usize,
    /// Deliveries that succeeded.
    pub delivered: usize,
    /// Deliveries that failed.
    pub failures: Vec<DeliveryFailure>,
}

impl FanoutReport {
    /// Whether every attempted delivery succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delivers `userJoined` notifications to a group's registered connections.
#[derive(Clone)]
pub struct BroadcastFanout {
    registry: Arc<dyn ConnectionRegistry>,
    transport: Arc<dyn Transport>,
}

impl BroadcastFanout {
    /// Fan out over `registry`'s connections through `transport`.
    pub fn new(registry: Arc<dyn ConnectionRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Notify every connection registered for `group_id` that `user_id` joined.
    ///
    /// The joining user's own connections are included.
    pub async fn broadcast_joined(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        message: &str,
    ) -> FanoutReport {
        let started = Instant::now();

        let connections = match self.registry.list_by_group(group_id).await {
            Ok(c) => c,
            Err(e) => {
                error!(%group_id, error = %e, "failed to list connections for fanout");
                return FanoutReport::default();
            }
        };

        let notification = UserJoined::new(user_id.clone(), group_id.clone(), message);
        let payload = match serde_json::to_string(&notification) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                error!(%group_id, error = %e, "failed to serialize notification");
                return FanoutReport::default();
            }
        };

        let attempts = connections.into_iter().map(|record| {
            let payload = Arc::clone(&payload);
            async move {
                let result = self.transport.deliver(&record.connection_id, payload).await;
                (record.connection_id, result)
            }
        });
        let results = join_all(attempts).await;

        let mut report = FanoutReport {
            attempted: results.len(),
            ..FanoutReport::default()
        };
        for (connection_id, result) in results {
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    counter!(DELIVERIES_TOTAL, "result" => "delivered").increment(1);
                }
                Err(error) => {
                    warn!(%group_id, %connection_id, %error, "delivery failed");
                    counter!(DELIVERIES_TOTAL, "result" => error.label()).increment(1);
                    report.failures.push(DeliveryFailure {
                        connection_id,
                        error,
                    });
                }
            }
        }

        histogram!(FANOUT_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        debug!(
            %group_id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failures.len(),
            "fanout complete"
        );
        report
    }
}
