use std::sync::Arc;

use tokio::select;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::client::client_config::ClientConfig;
use crate::client::fault_injector::FaultInjector;
use crate::client::inbound_dispatcher::{run_inbound_dispatcher, InboundDispatcher};
use crate::client::mission::MissionBoard;
use crate::client::mission_executor::MissionExecutor;
use crate::client::status_sampler::{run_status_sampler, StatusTable};
use crate::client::telemetry_reporter::run_telemetry_reporter;
use crate::graph::Graph;
use crate::messaging::udp_messaging::UdpMessaging;

/// Runs the client's roles concurrently on one socket: status sampling, telemetry reporting,
///  mission execution and the receive loop feeding the latter two. It runs until the future is
///  dropped.
pub async fn run_client(
    config: Arc<ClientConfig>,
    graph: Arc<Graph>,
    messaging: Arc<UdpMessaging>,
    injector: Arc<dyn FaultInjector>,
) -> anyhow::Result<()> {
    info!("client {:?} reporting to server {:?}", messaging.local_addr()?, config.server_addr);

    let (status_tx, status_rx) = watch::channel(StatusTable::all_clear(graph.len()));
    let (telemetry_ack_tx, telemetry_ack_rx) = mpsc::channel(1);
    let (completion_ack_tx, completion_ack_rx) = mpsc::channel(1);
    let board = Arc::new(MissionBoard::new(config.order_conflict_policy));

    let dispatcher = InboundDispatcher::new(
        config.clone(),
        graph.clone(),
        messaging.clone(),
        board.clone(),
        telemetry_ack_tx,
        completion_ack_tx,
    );
    let executor = MissionExecutor::new(
        config.clone(),
        graph.clone(),
        messaging.clone(),
        board,
        injector.clone(),
        completion_ack_rx,
    );

    select! {
        _ = run_status_sampler(config.clone(), graph, injector, status_tx) => {}
        _ = run_telemetry_reporter(config, messaging.clone(), status_rx, telemetry_ack_rx) => {}
        _ = executor.run() => {}
        _ = run_inbound_dispatcher(&dispatcher, &messaging) => {}
    }
    Ok(())
}
