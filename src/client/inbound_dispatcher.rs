use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::client::client_config::ClientConfig;
use crate::client::mission::{Mission, MissionBoard, OrderOutcome};
use crate::graph::{CityKind, Graph};
use crate::messaging::messages::{AckKind, AssignmentData, WildfireMessage};
use crate::messaging::messaging::{MessageSender, RECV_BUF_SIZE};
use crate::messaging::udp_messaging::UdpMessaging;

/// Routes everything the server sends to the client role that waits for it. Acks are passed
///  on through single-slot channels without blocking, team orders go to the mission board.
pub struct InboundDispatcher<M: MessageSender> {
    config: Arc<ClientConfig>,
    graph: Arc<Graph>,
    messaging: Arc<M>,
    board: Arc<MissionBoard>,
    telemetry_acks: mpsc::Sender<()>,
    completion_acks: mpsc::Sender<()>,
}

impl <M: MessageSender> InboundDispatcher<M> {
    pub fn new(
        config: Arc<ClientConfig>,
        graph: Arc<Graph>,
        messaging: Arc<M>,
        board: Arc<MissionBoard>,
        telemetry_acks: mpsc::Sender<()>,
        completion_acks: mpsc::Sender<()>,
    ) -> InboundDispatcher<M> {
        InboundDispatcher {
            config,
            graph,
            messaging,
            board,
            telemetry_acks,
            completion_acks,
        }
    }

    pub async fn on_datagram(&self, from: SocketAddr, datagram: &[u8]) {
        match WildfireMessage::deser(datagram) {
            Ok(msg) => self.on_message(from, msg).await,
            Err(e) => warn!("discarding malformed datagram from {:?}: {}", from, e),
        }
    }

    pub async fn on_message(&self, from: SocketAddr, msg: WildfireMessage) {
        match msg {
            WildfireMessage::Ack(AckKind::Telemetry) => Self::signal(&self.telemetry_acks, "telemetry"),
            WildfireMessage::Ack(AckKind::Completion) => Self::signal(&self.completion_acks, "completion"),
            WildfireMessage::Ack(AckKind::TeamOrder) => {
                debug!("received a team order ack from {:?} - only clients send those, ignoring", from);
            }
            WildfireMessage::TeamOrder(data) => self.on_team_order(from, data).await,
            WildfireMessage::Telemetry(_) | WildfireMessage::Completion(_) => {
                warn!("received unexpected {:?} message from {:?} - ignoring", msg.message_type(), from);
            }
        }
    }

    fn signal(acks: &mpsc::Sender<()>, kind: &str) {
        match acks.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("{} ack pending already - ignoring duplicate", kind),
            Err(TrySendError::Closed(_)) => error!("{} acks are not consumed any more", kind),
        }
    }

    async fn on_team_order(&self, from: SocketAddr, data: AssignmentData) {
        let (city, team) = match (self.graph.validate_id(data.city_id), self.graph.validate_id(data.team_id)) {
            (Ok(city), Ok(team)) => (city, team),
            (Err(e), _) | (_, Err(e)) => {
                warn!("discarding team order from {:?}: {}", from, e);
                return;
            }
        };
        if self.graph.classify(team) != Some(CityKind::Capital) {
            warn!("discarding team order from {:?}: {} (id={}) has no team", from, self.graph.city_name(team), team);
            return;
        }

        info!("team order received: team {} (id={}) to {} (id={})",
            self.graph.city_name(team), team, self.graph.city_name(city), city);

        // receipt is acknowledged whether or not the order can be executed
        self.messaging.send(self.config.server_addr, &WildfireMessage::Ack(AckKind::TeamOrder)).await;

        match self.board.offer(Mission { city, team }).await {
            OrderOutcome::Installed | OrderOutcome::Queued => {}
            OrderOutcome::Dropped => debug!("order {:?} was not accepted", data),
        }
    }
}

/// The client's single receive loop. It runs until the future is dropped.
pub async fn run_inbound_dispatcher(dispatcher: &InboundDispatcher<UdpMessaging>, messaging: &UdpMessaging) {
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    loop {
        match messaging.recv_datagram(&mut buf).await {
            Ok((len, from)) => dispatcher.on_datagram(from, &buf[..len]).await,
            Err(e) => error!("error receiving datagram: {}", e),
        }
    }
}
