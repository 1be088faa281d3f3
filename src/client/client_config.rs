use std::net::SocketAddr;
use std::ops::Range;
use std::time::Duration;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OrderConflictPolicy {
    /// An order arriving while a mission is active is dropped. The client has a single team
    ///  capacity, and the dropped order's team stays busy on the server.
    Drop,
    /// Orders arriving while a mission is active are queued and executed in arrival order
    Queue,
}

#[derive(Debug)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,

    pub sample_interval: Duration,
    /// probability for each city to be in alert on each sample, between 0.0 and 1.0
    pub alert_probability: f64,

    pub telemetry_interval: Duration,
    pub telemetry_ack_timeout: Duration,

    /// simulated mission durations in seconds
    pub mission_duration_secs: Range<u64>,
    /// If set, a completion report is sent again at this interval until it is acknowledged.
    ///  Waiting for the acknowledgement is unbounded either way.
    pub completion_resend_interval: Option<Duration>,

    pub order_conflict_policy: OrderConflictPolicy,
}

impl ClientConfig {
    pub fn new(server_addr: SocketAddr) -> ClientConfig {
        ClientConfig {
            server_addr,
            sample_interval: Duration::from_secs(5),
            alert_probability: 0.03,
            telemetry_interval: Duration::from_secs(10),
            telemetry_ack_timeout: Duration::from_secs(5),
            mission_duration_secs: 5..20,
            completion_resend_interval: None,
            order_conflict_policy: OrderConflictPolicy::Drop,
        }
    }
}
