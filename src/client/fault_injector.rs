use std::ops::Range;
use std::time::Duration;

use rand::Rng;

use crate::graph::City;

/// Decides where fires break out and how long fighting them takes. The client's roles only see
///  this trait, so simulations can be scripted in tests.
#[cfg_attr(test, mockall::automock)]
pub trait FaultInjector: Send + Sync + 'static {
    fn is_alerting(&self, city: &City) -> bool;
    fn mission_duration(&self) -> Duration;
}

pub struct RandomFaultInjector {
    alert_probability: f64,
    mission_duration_secs: Range<u64>,
}
impl RandomFaultInjector {
    pub fn new(alert_probability: f64, mission_duration_secs: Range<u64>) -> anyhow::Result<RandomFaultInjector> {
        if !(0.0..=1.0).contains(&alert_probability) {
            anyhow::bail!("alert probability must be between 0.0 and 1.0, was {}", alert_probability);
        }
        if mission_duration_secs.is_empty() {
            anyhow::bail!("mission duration range {:?} is empty", mission_duration_secs);
        }
        Ok(RandomFaultInjector {
            alert_probability,
            mission_duration_secs,
        })
    }
}

impl FaultInjector for RandomFaultInjector {
    fn is_alerting(&self, _city: &City) -> bool {
        rand::rng().random_bool(self.alert_probability)
    }

    fn mission_duration(&self) -> Duration {
        Duration::from_secs(rand::rng().random_range(self.mission_duration_secs.clone()))
    }
}
