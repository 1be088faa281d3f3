use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::Level;

use wildfire_dispatch::client::client_config::ClientConfig;
use wildfire_dispatch::client::wildfire_client::run_client;
use wildfire_dispatch::messaging::messages::{AckKind, AssignmentData, TelemetryEntry, TelemetryReport, WildfireMessage};
use wildfire_dispatch::messaging::messaging::{MessageSender, RECV_BUF_SIZE};
use wildfire_dispatch::messaging::udp_messaging::{AddressFamily, UdpMessaging};
use wildfire_dispatch::server::dispatch_server::run_server;
use wildfire_dispatch::server::server_config::ServerConfig;
use wildfire_dispatch::test_util::fault_injector::ScriptedFaultInjector;
use wildfire_dispatch::test_util::graph::test_graph;

#[ctor::ctor]
fn init_test_logging() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init()
        .ok();
}

async fn bind_loopback() -> UdpMessaging {
    UdpMessaging::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
}

async fn recv(messaging: &UdpMessaging) -> (SocketAddr, WildfireMessage) {
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    let (len, from) = timeout(Duration::from_secs(5), messaging.recv_datagram(&mut buf)).await
        .expect("timed out waiting for a datagram")
        .unwrap();
    (from, WildfireMessage::deser(&buf[..len]).unwrap())
}

/// skips the client's periodic telemetry
async fn recv_non_telemetry(messaging: &UdpMessaging) -> WildfireMessage {
    loop {
        match recv(messaging).await {
            (_, WildfireMessage::Telemetry(_)) => continue,
            (_, msg) => return msg,
        }
    }
}

fn telemetry(alerting: &[i32]) -> WildfireMessage {
    let entries = (0..6)
        .map(|city_id| TelemetryEntry { city_id, alert: alerting.contains(&city_id) })
        .collect();
    WildfireMessage::Telemetry(TelemetryReport::new(entries).unwrap())
}

fn order(city_id: i32, team_id: i32) -> WildfireMessage {
    WildfireMessage::TeamOrder(AssignmentData { city_id, team_id })
}

fn completion(city_id: i32, team_id: i32) -> WildfireMessage {
    WildfireMessage::Completion(AssignmentData { city_id, team_id })
}

#[tokio::test]
async fn test_server_dispatch_cycle() {
    let server_messaging = Arc::new(bind_loopback().await);
    let server_addr = server_messaging.local_addr().unwrap();
    let mut config = ServerConfig::new(AddressFamily::Ipv4);
    config.status_log_interval = None;
    let server = tokio::spawn(run_server(Arc::new(config), Arc::new(test_graph()), server_messaging));

    let client = bind_loopback().await;

    client.try_send(server_addr, &telemetry(&[5])).await.unwrap();
    assert_eq!(recv(&client).await, (server_addr, WildfireMessage::Ack(AckKind::Telemetry)));
    assert_eq!(recv(&client).await, (server_addr, order(5, 2)));
    client.try_send(server_addr, &WildfireMessage::Ack(AckKind::TeamOrder)).await.unwrap();

    // city 5 is already served, and team 2 is busy: city 3 gets team 1
    client.try_send(server_addr, &telemetry(&[3, 5])).await.unwrap();
    assert_eq!(recv(&client).await, (server_addr, WildfireMessage::Ack(AckKind::Telemetry)));
    assert_eq!(recv(&client).await, (server_addr, order(3, 1)));

    client.try_send(server_addr, &completion(5, 2)).await.unwrap();
    assert_eq!(recv(&client).await, (server_addr, WildfireMessage::Ack(AckKind::Completion)));

    client.try_send(server_addr, &telemetry(&[5])).await.unwrap();
    assert_eq!(recv(&client).await, (server_addr, WildfireMessage::Ack(AckKind::Telemetry)));
    assert_eq!(recv(&client).await, (server_addr, order(5, 2)));

    server.abort();
}

#[tokio::test]
async fn test_malformed_datagram_is_ignored_by_server() {
    let server_messaging = Arc::new(bind_loopback().await);
    let server_addr = server_messaging.local_addr().unwrap();
    let mut config = ServerConfig::new(AddressFamily::Ipv4);
    config.status_log_interval = None;
    let server = tokio::spawn(run_server(Arc::new(config), Arc::new(test_graph()), server_messaging));

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // completion header claiming 12 payload bytes, followed by only 8
    client.send_to(&[0, 4, 0, 12, 0, 0, 0, 5, 0, 0, 0, 2], server_addr).await.unwrap();
    client.send_to(&[0, 1], server_addr).await.unwrap();

    let client = UdpMessaging::new(client);
    client.try_send(server_addr, &telemetry(&[])).await.unwrap();
    assert_eq!(recv(&client).await, (server_addr, WildfireMessage::Ack(AckKind::Telemetry)));

    server.abort();
}

#[tokio::test]
async fn test_client_mission_cycle() {
    let server = bind_loopback().await;
    let server_addr = server.local_addr().unwrap();

    let mut config = ClientConfig::new(server_addr);
    config.sample_interval = Duration::from_millis(50);
    config.telemetry_interval = Duration::from_millis(100);
    config.telemetry_ack_timeout = Duration::from_millis(50);

    let injector = Arc::new(ScriptedFaultInjector::new(&[5], Duration::from_millis(200)));
    let client_messaging = Arc::new(bind_loopback().await);
    let client_addr = client_messaging.local_addr().unwrap();
    let client = tokio::spawn(run_client(Arc::new(config), Arc::new(test_graph()), client_messaging, injector));

    let report = loop {
        let (from, msg) = recv(&server).await;
        assert_eq!(from, client_addr);
        if let WildfireMessage::Telemetry(report) = msg {
            if report.alerting_city_ids().next().is_some() {
                break report;
            }
        }
    };
    assert_eq!(report.total(), 6);
    assert_eq!(report.alerting_city_ids().collect::<Vec<_>>(), vec![5]);
    server.try_send(client_addr, &WildfireMessage::Ack(AckKind::Telemetry)).await.unwrap();

    server.try_send(client_addr, &order(5, 2)).await.unwrap();
    assert_eq!(recv_non_telemetry(&server).await, WildfireMessage::Ack(AckKind::TeamOrder));

    // a second order during the mission is acknowledged, but not executed
    server.try_send(client_addr, &order(3, 1)).await.unwrap();
    assert_eq!(recv_non_telemetry(&server).await, WildfireMessage::Ack(AckKind::TeamOrder));

    assert_eq!(recv_non_telemetry(&server).await, completion(5, 2));
    server.try_send(client_addr, &WildfireMessage::Ack(AckKind::Completion)).await.unwrap();

    // the mission was cleared, so the next order is executed
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.try_send(client_addr, &order(0, 1)).await.unwrap();
    assert_eq!(recv_non_telemetry(&server).await, WildfireMessage::Ack(AckKind::TeamOrder));
    assert_eq!(recv_non_telemetry(&server).await, completion(0, 1));

    client.abort();
}
