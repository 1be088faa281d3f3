use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::client::fault_injector::FaultInjector;
use crate::graph::{City, CityId};

/// A deterministic [FaultInjector]: the alerting cities are set explicitly and stay in alert
///  until they are changed, and every mission takes the same time.
pub struct ScriptedFaultInjector {
    /// bit i set means city i is alerting; ids fit because of MAX_CITIES
    alerting: AtomicU64,
    mission_duration: Duration,
}
impl ScriptedFaultInjector {
    pub fn new(alerting: &[CityId], mission_duration: Duration) -> ScriptedFaultInjector {
        let result = ScriptedFaultInjector {
            alerting: AtomicU64::new(0),
            mission_duration,
        };
        result.set_alerting(alerting);
        result
    }

    pub fn set_alerting(&self, cities: &[CityId]) {
        let mask = cities.iter()
            .filter(|&&city| city < u64::BITS as usize)
            .fold(0u64, |mask, &city| mask | (1 << city));
        self.alerting.store(mask, Ordering::Release);
    }
}

impl FaultInjector for ScriptedFaultInjector {
    fn is_alerting(&self, city: &City) -> bool {
        city.id < u64::BITS as usize && self.alerting.load(Ordering::Acquire) & (1 << city.id) != 0
    }

    fn mission_duration(&self) -> Duration {
        self.mission_duration
    }
}
