use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{self, timeout};
use tracing::{debug, info, warn};

use crate::client::client_config::ClientConfig;
use crate::client::fault_injector::FaultInjector;
use crate::client::mission::{Mission, MissionBoard};
use crate::graph::Graph;
use crate::messaging::messages::{AssignmentData, WildfireMessage};
use crate::messaging::messaging::MessageSender;

pub struct MissionExecutor<M: MessageSender> {
    config: Arc<ClientConfig>,
    graph: Arc<Graph>,
    messaging: Arc<M>,
    board: Arc<MissionBoard>,
    injector: Arc<dyn FaultInjector>,
    completion_acks: mpsc::Receiver<()>,
}

impl <M: MessageSender> MissionExecutor<M> {
    pub fn new(
        config: Arc<ClientConfig>,
        graph: Arc<Graph>,
        messaging: Arc<M>,
        board: Arc<MissionBoard>,
        injector: Arc<dyn FaultInjector>,
        completion_acks: mpsc::Receiver<()>,
    ) -> MissionExecutor<M> {
        MissionExecutor {
            config,
            graph,
            messaging,
            board,
            injector,
            completion_acks,
        }
    }

    pub async fn run(mut self) {
        loop {
            let mission = self.board.wait_for_mission().await;
            self.execute(mission).await;
        }
    }

    /// Simulates the mission and reports its completion. The mission stays active until the
    ///  server acknowledged the completion, however long that takes.
    pub async fn execute(&mut self, mission: Mission) {
        let duration = self.injector.mission_duration();
        info!("team {} (id={}) fighting the fire in {} (id={}), estimated {:?}",
            self.graph.city_name(mission.team), mission.team, self.graph.city_name(mission.city), mission.city, duration);
        time::sleep(duration).await;

        while self.completion_acks.try_recv().is_ok() {
            debug!("discarding stale completion ack");
        }

        let completion = WildfireMessage::Completion(AssignmentData {
            city_id: mission.city as i32,
            team_id: mission.team as i32,
        });
        info!("fire in {} (id={}) extinguished, reporting completion", self.graph.city_name(mission.city), mission.city);
        self.messaging.send(self.config.server_addr, &completion).await;

        self.await_completion_ack(&completion).await;
        info!("completion of mission {:?} acknowledged", mission);

        if let Some(next) = self.board.complete(mission).await {
            debug!("next mission: {:?}", next);
        }
    }

    async fn await_completion_ack(&mut self, completion: &WildfireMessage) {
        let Some(resend_interval) = self.config.completion_resend_interval else {
            if self.completion_acks.recv().await.is_none() {
                warn!("completion ack channel closed");
            }
            return;
        };

        loop {
            match timeout(resend_interval, self.completion_acks.recv()).await {
                Ok(Some(())) => return,
                Ok(None) => {
                    warn!("completion ack channel closed");
                    return;
                }
                Err(_) => {
                    debug!("no completion ack within {:?} - resending", resend_interval);
                    self.messaging.send(self.config.server_addr, completion).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::client_config::OrderConflictPolicy;
    use crate::client::fault_injector::MockFaultInjector;
    use crate::test_util::graph::test_graph;
    use crate::test_util::message::{test_addr, TrackingMockMessageSender};

    const MISSION: Mission = Mission { city: 5, team: 2 };

    struct Fixture {
        executor: MissionExecutor<TrackingMockMessageSender>,
        messaging: Arc<TrackingMockMessageSender>,
        board: Arc<MissionBoard>,
        ack_tx: mpsc::Sender<()>,
    }

    fn fixture(resend_interval: Option<Duration>) -> Fixture {
        let mut config = ClientConfig::new(test_addr(8080));
        config.completion_resend_interval = resend_interval;

        let mut injector = MockFaultInjector::new();
        injector.expect_mission_duration()
            .returning(|| Duration::from_secs(7));

        let messaging = Arc::new(TrackingMockMessageSender::new());
        let board = Arc::new(MissionBoard::new(OrderConflictPolicy::Drop));
        let (ack_tx, ack_rx) = mpsc::channel(1);

        let executor = MissionExecutor::new(
            Arc::new(config),
            Arc::new(test_graph()),
            messaging.clone(),
            board.clone(),
            Arc::new(injector),
            ack_rx,
        );
        Fixture { executor, messaging, board, ack_tx }
    }

    fn completion() -> WildfireMessage {
        WildfireMessage::Completion(AssignmentData { city_id: 5, team_id: 2 })
    }

    #[tokio::test(start_paused = true)]
    async fn test_mission_lifecycle() {
        let Fixture { executor, messaging, board, ack_tx } = fixture(None);
        let task = tokio::spawn(executor.run());

        board.offer(MISSION).await;

        time::sleep(Duration::from_secs(6)).await;
        messaging.assert_no_remaining_messages().await;

        time::sleep(Duration::from_secs(2)).await;
        messaging.assert_message_sent(test_addr(8080), completion()).await;
        messaging.assert_no_remaining_messages().await;

        // without an ack, the mission stays active indefinitely
        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(board.active().await, Some(MISSION));
        messaging.assert_no_remaining_messages().await;

        ack_tx.send(()).await.unwrap();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(board.active().await, None);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_is_resent_until_acked() {
        let Fixture { mut executor, messaging, board, ack_tx } = fixture(Some(Duration::from_secs(3)));
        board.offer(MISSION).await;

        let ack_sender = tokio::spawn(async move {
            // mission ends at 7, resends at 10 and 13
            time::sleep(Duration::from_secs(14)).await;
            ack_tx.send(()).await.unwrap();
        });

        executor.execute(MISSION).await;

        for _ in 0..3 {
            messaging.assert_message_sent(test_addr(8080), completion()).await;
        }
        messaging.assert_no_remaining_messages().await;
        assert_eq!(board.active().await, None);
        ack_sender.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ack_does_not_complete_mission() {
        let Fixture { executor, messaging, board, ack_tx } = fixture(None);
        ack_tx.send(()).await.unwrap();

        let task = tokio::spawn(executor.run());
        board.offer(MISSION).await;

        time::sleep(Duration::from_secs(60)).await;
        messaging.assert_message_sent(test_addr(8080), completion()).await;
        assert_eq!(board.active().await, Some(MISSION));

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_mission_runs_after_completion() {
        let mut config = ClientConfig::new(test_addr(8080));
        config.order_conflict_policy = OrderConflictPolicy::Queue;

        let mut injector = MockFaultInjector::new();
        injector.expect_mission_duration()
            .times(2)
            .returning(|| Duration::from_secs(5));

        let messaging = Arc::new(TrackingMockMessageSender::new());
        let board = Arc::new(MissionBoard::new(OrderConflictPolicy::Queue));
        let (ack_tx, ack_rx) = mpsc::channel(1);
        let executor = MissionExecutor::new(Arc::new(config), Arc::new(test_graph()), messaging.clone(), board.clone(), Arc::new(injector), ack_rx);
        let task = tokio::spawn(executor.run());

        let second = Mission { city: 0, team: 1 };
        board.offer(MISSION).await;
        board.offer(second).await;

        time::sleep(Duration::from_secs(6)).await;
        messaging.assert_message_sent(test_addr(8080), completion()).await;
        ack_tx.send(()).await.unwrap();

        time::sleep(Duration::from_secs(6)).await;
        messaging.assert_message_sent(test_addr(8080), WildfireMessage::Completion(AssignmentData { city_id: 0, team_id: 1 })).await;
        assert_eq!(board.active().await, Some(second));

        task.abort();
    }
}
