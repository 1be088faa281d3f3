use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, timeout, Instant};
use tracing::{debug, error, warn};

use crate::client::client_config::ClientConfig;
use crate::client::status_sampler::StatusTable;
use crate::messaging::messages::WildfireMessage;
use crate::messaging::messaging::MessageSender;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TelemetryOutcome {
    Acked,
    /// There is no retransmission: the next periodic report carries current data anyway
    TimedOut,
    NotSent,
}

/// Sends the latest status snapshot to the server periodically, starting one interval after
///  startup.
pub async fn run_telemetry_reporter<M: MessageSender>(
    config: Arc<ClientConfig>,
    messaging: Arc<M>,
    status: watch::Receiver<StatusTable>,
    mut acks: mpsc::Receiver<()>,
) {
    let mut ticks = time::interval_at(Instant::now() + config.telemetry_interval, config.telemetry_interval);
    loop {
        ticks.tick().await;
        report_telemetry(&config, messaging.as_ref(), &status, &mut acks).await;
    }
}

/// Sends a single report and waits a bounded time for its acknowledgement.
pub async fn report_telemetry<M: MessageSender>(
    config: &ClientConfig,
    messaging: &M,
    status: &watch::Receiver<StatusTable>,
    acks: &mut mpsc::Receiver<()>,
) -> TelemetryOutcome {
    let snapshot = status.borrow().clone();
    let report = match snapshot.to_report() {
        Ok(report) => report,
        Err(e) => {
            error!("unable to build telemetry report: {}", e);
            return TelemetryOutcome::NotSent;
        }
    };

    // an ack arriving after its report timed out must not be taken for this report's
    while acks.try_recv().is_ok() {
        debug!("discarding late telemetry ack");
    }

    debug!("sending telemetry: {} cities, {} alerts", report.total(), snapshot.alerting().count());
    messaging.send(config.server_addr, &WildfireMessage::Telemetry(report)).await;

    match timeout(config.telemetry_ack_timeout, acks.recv()).await {
        Ok(Some(())) => {
            debug!("telemetry acknowledged");
            TelemetryOutcome::Acked
        }
        Ok(None) => {
            warn!("telemetry ack channel closed");
            TelemetryOutcome::TimedOut
        }
        Err(_) => {
            warn!("no telemetry ack from {:?} within {:?}", config.server_addr, config.telemetry_ack_timeout);
            TelemetryOutcome::TimedOut
        }
    }
}
