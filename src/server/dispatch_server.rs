use std::net::SocketAddr;
use std::sync::Arc;

use bit_set::BitSet;
use tokio::{select, time};
use tracing::{debug, error, info, warn};

use crate::dispatch::{select_team, TeamAvailability, TeamSelection};
use crate::graph::{CityId, CityKind, Graph};
use crate::messaging::messages::{AckKind, AssignmentData, TelemetryReport, WildfireMessage};
use crate::messaging::messaging::{MessageSender, RECV_BUF_SIZE};
use crate::messaging::udp_messaging::UdpMessaging;
use crate::server::server_config::ServerConfig;

/// The server's complete state. It is owned by a single sequential loop, so selecting a team
///  and marking it busy can never interleave with the handling of another alert.
pub struct DispatchServer<M: MessageSender> {
    graph: Arc<Graph>,
    messaging: Arc<M>,
    availability: TeamAvailability,
    /// cities with a dispatched mission that was not reported complete yet
    active_missions: BitSet,
}

impl <M: MessageSender> DispatchServer<M> {
    pub fn new(graph: Arc<Graph>, messaging: Arc<M>) -> DispatchServer<M> {
        let num_cities = graph.len();
        DispatchServer {
            graph,
            messaging,
            availability: TeamAvailability::new(num_cities),
            active_missions: BitSet::with_capacity(num_cities),
        }
    }

    pub fn availability(&self) -> &TeamAvailability {
        &self.availability
    }

    pub fn is_mission_active(&self, city: CityId) -> bool {
        self.active_missions.contains(city)
    }

    pub fn active_missions(&self) -> impl Iterator<Item = CityId> + '_ {
        self.active_missions.iter()
    }

    /// Entry point for raw datagrams: anything that does not decode is dropped here, before it
    ///  can touch any state.
    pub async fn on_datagram(&mut self, from: SocketAddr, datagram: &[u8]) {
        match WildfireMessage::deser(datagram) {
            Ok(msg) => self.on_message(from, msg).await,
            Err(e) => warn!("discarding malformed datagram from {:?}: {}", from, e),
        }
    }

    pub async fn on_message(&mut self, from: SocketAddr, msg: WildfireMessage) {
        match msg {
            WildfireMessage::Telemetry(report) => self.on_telemetry(from, report).await,
            WildfireMessage::Ack(kind) => {
                if kind == AckKind::TeamOrder {
                    info!("client {:?} confirmed receipt of a team order", from);
                }
                else {
                    debug!("received {:?} ack from {:?} - ignoring", kind, from);
                }
            }
            WildfireMessage::Completion(data) => self.on_completion(from, data).await,
            WildfireMessage::TeamOrder(data) => {
                warn!("received a team order {:?} from {:?} - only the server issues orders, ignoring", data, from);
            }
        }
    }

    async fn on_telemetry(&mut self, from: SocketAddr, report: TelemetryReport) {
        let mut alerting = Vec::new();
        for entry in report.entries() {
            match self.graph.validate_id(entry.city_id) {
                Ok(city) => if entry.alert { alerting.push(city) },
                Err(e) => {
                    warn!("discarding telemetry from {:?}: {}", from, e);
                    return;
                }
            }
        }

        // acknowledge receipt before processing: the ack is about the transport, not about
        //  whether alerts can be served
        self.messaging.send(from, &WildfireMessage::Ack(AckKind::Telemetry)).await;

        debug!("telemetry from {:?}: {} cities, {} alerts", from, report.total(), alerting.len());

        for city in alerting {
            if self.active_missions.contains(city) {
                debug!("{} (id={}) is already being served", self.graph.city_name(city), city);
                continue;
            }
            info!("alert in {} (id={})", self.graph.city_name(city), city);
            self.dispatch(from, city).await;
        }
    }

    async fn dispatch(&mut self, to: SocketAddr, city: CityId) {
        match select_team(&self.graph, city, &self.availability) {
            TeamSelection::Selected { team, distance } => {
                info!("dispatching team {} (id={}) to {} (id={}), distance {} km",
                    self.graph.city_name(team), team, self.graph.city_name(city), city, distance);

                self.availability.mark_busy(team);
                self.active_missions.insert(city);

                let order = AssignmentData {
                    city_id: city as i32,
                    team_id: team as i32,
                };
                self.messaging.send(to, &WildfireMessage::TeamOrder(order)).await;
            }
            TeamSelection::NoTeamAvailable => {
                warn!("no team available for {} (id={})", self.graph.city_name(city), city);
            }
        }
    }

    async fn on_completion(&mut self, from: SocketAddr, data: AssignmentData) {
        let (city, team) = match (self.graph.validate_id(data.city_id), self.graph.validate_id(data.team_id)) {
            (Ok(city), Ok(team)) => (city, team),
            (Err(e), _) | (_, Err(e)) => {
                warn!("discarding completion from {:?}: {}", from, e);
                return;
            }
        };
        if self.graph.classify(team) != Some(CityKind::Capital) {
            warn!("discarding completion from {:?}: {} (id={}) has no team", from, self.graph.city_name(team), team);
            return;
        }

        if self.availability.mark_free(team) {
            info!("mission in {} (id={}) completed, team {} (id={}) is available again",
                self.graph.city_name(city), city, self.graph.city_name(team), team);
        }
        else {
            debug!("completion for team {} which was not busy - duplicate?", team);
        }
        self.active_missions.remove(city);

        self.messaging.send(from, &WildfireMessage::Ack(AckKind::Completion)).await;
    }

    fn log_status(&self) {
        let busy = self.availability.busy_teams()
            .map(|team| self.graph.city_name(team))
            .collect::<Vec<_>>();
        let active = self.active_missions()
            .map(|city| self.graph.city_name(city))
            .collect::<Vec<_>>();
        info!("busy teams: {:?}, active missions: {:?}", busy, active);
    }
}

/// The server's main loop, handling one datagram at a time. It runs until the future is dropped.
pub async fn run_server(config: Arc<ServerConfig>, graph: Arc<Graph>, messaging: Arc<UdpMessaging>) -> anyhow::Result<()> {
    let mut server = DispatchServer::new(graph, messaging.clone());
    info!("dispatch server listening on {:?}", messaging.local_addr()?);

    let mut status_ticks = config.status_log_interval
        .map(time::interval);

    let mut buf = vec![0u8; RECV_BUF_SIZE];
    loop {
        select! {
            received = messaging.recv_datagram(&mut buf) => {
                match received {
                    Ok((len, from)) => server.on_datagram(from, &buf[..len]).await,
                    Err(e) => {
                        // e.g. ICMP 'port unreachable' surfacing on some platforms - not fatal
                        error!("error receiving datagram: {}", e);
                    }
                }
            }
            _ = tick(&mut status_ticks) => server.log_status(),
        }
    }
}

async fn tick(interval: &mut Option<time::Interval>) {
    match interval {
        Some(interval) => { interval.tick().await; }
        None => std::future::pending().await,
    }
}
