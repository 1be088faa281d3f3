use std::sync::Arc;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info};

use crate::client::client_config::ClientConfig;
use crate::client::fault_injector::FaultInjector;
use crate::graph::{CityId, Graph};
use crate::messaging::messages::{TelemetryEntry, TelemetryReport};

/// The alert flag of every city in the graph, indexed by city id
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct StatusTable {
    alerts: Vec<bool>,
}
impl StatusTable {
    pub fn all_clear(num_cities: usize) -> StatusTable {
        StatusTable {
            alerts: vec![false; num_cities],
        }
    }

    pub fn sample(graph: &Graph, injector: &dyn FaultInjector) -> StatusTable {
        StatusTable {
            alerts: graph.cities().iter()
                .map(|city| injector.is_alerting(city))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn is_alerting(&self, city: CityId) -> bool {
        self.alerts.get(city).copied().unwrap_or(false)
    }

    pub fn alerting(&self) -> impl Iterator<Item = CityId> + '_ {
        self.alerts.iter()
            .enumerate()
            .filter(|(_, &alert)| alert)
            .map(|(city, _)| city)
    }

    pub fn to_report(&self) -> anyhow::Result<TelemetryReport> {
        let entries = self.alerts.iter()
            .enumerate()
            .map(|(city, &alert)| TelemetryEntry { city_id: city as i32, alert })
            .collect();
        TelemetryReport::new(entries)
    }
}

/// Re-samples the status of all cities periodically, publishing each snapshot as a whole. The
///  first sample is taken immediately.
pub async fn run_status_sampler(
    config: Arc<ClientConfig>,
    graph: Arc<Graph>,
    injector: Arc<dyn FaultInjector>,
    status: watch::Sender<StatusTable>,
) {
    let mut ticks = time::interval(config.sample_interval);
    loop {
        ticks.tick().await;

        let sample = StatusTable::sample(&graph, injector.as_ref());
        for city in sample.alerting() {
            info!("fire detected in {} (id={})", graph.city_name(city), city);
        }
        debug!("sampled {} cities, {} alerts", sample.len(), sample.alerting().count());

        status.send_replace(sample);
    }
}
