use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::client::client_config::OrderConflictPolicy;
use crate::graph::CityId;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Mission {
    pub city: CityId,
    pub team: CityId,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OrderOutcome {
    /// the mission became active, and the executor was woken up
    Installed,
    Queued,
    Dropped,
}

/// The client's record of its mission: at most one is active at any time. The inbound
///  dispatcher offers missions, the mission executor waits for and completes them.
pub struct MissionBoard {
    policy: OrderConflictPolicy,
    state: Mutex<MissionState>,
    mission_started: Notify,
}

#[derive(Default)]
struct MissionState {
    active: Option<Mission>,
    queued: VecDeque<Mission>,
}

impl MissionBoard {
    pub fn new(policy: OrderConflictPolicy) -> MissionBoard {
        MissionBoard {
            policy,
            state: Default::default(),
            mission_started: Notify::new(),
        }
    }

    /// An active mission is never replaced by an offered one.
    pub async fn offer(&self, mission: Mission) -> OrderOutcome {
        let mut state = self.state.lock().await;

        let Some(active) = state.active else {
            state.active = Some(mission);
            self.mission_started.notify_one();
            info!("mission {:?} registered for execution", mission);
            return OrderOutcome::Installed;
        };

        match self.policy {
            OrderConflictPolicy::Drop => {
                warn!("mission {:?} is still active - dropping order {:?}", active, mission);
                OrderOutcome::Dropped
            }
            OrderConflictPolicy::Queue => {
                if active == mission || state.queued.contains(&mission) {
                    debug!("duplicate order {:?} - ignoring", mission);
                    return OrderOutcome::Dropped;
                }
                info!("mission {:?} is still active - queueing order {:?}", active, mission);
                state.queued.push_back(mission);
                OrderOutcome::Queued
            }
        }
    }

    pub async fn active(&self) -> Option<Mission> {
        self.state.lock().await.active
    }

    pub async fn queued(&self) -> Vec<Mission> {
        self.state.lock().await
            .queued.iter()
            .cloned()
            .collect()
    }

    /// waits until there is an active mission
    pub async fn wait_for_mission(&self) -> Mission {
        loop {
            if let Some(mission) = self.active().await {
                return mission;
            }
            // a notification between the check and here is stored as a permit
            self.mission_started.notified().await;
        }
    }

    /// Clears `mission` if it is the active one, promoting the next queued mission if there is
    ///  one. Returns the new active mission.
    pub async fn complete(&self, mission: Mission) -> Option<Mission> {
        let mut state = self.state.lock().await;
        if state.active != Some(mission) {
            warn!("completing mission {:?}, but the active mission is {:?} - ignoring", mission, state.active);
            return state.active;
        }

        state.active = state.queued.pop_front();
        if state.active.is_some() {
            self.mission_started.notify_one();
        }
        state.active
    }
}
