use std::sync::Arc;

use clap::Parser;
use clap_derive::{Parser, ValueEnum};
use tokio::select;
use tracing::{info, Level};

use wildfire_dispatch::client::client_config::{ClientConfig, OrderConflictPolicy};
use wildfire_dispatch::client::fault_injector::RandomFaultInjector;
use wildfire_dispatch::client::wildfire_client::run_client;
use wildfire_dispatch::graph::graph_loader::load_graph;
use wildfire_dispatch::messaging::udp_messaging::{resolve_server_addr, AddressFamily, UdpMessaging};
use wildfire_dispatch::server::server_config::DEFAULT_PORT;

#[derive(Copy, Clone, ValueEnum)]
enum Family {
    #[value(alias = "v4")]
    Ipv4,
    #[value(alias = "v6")]
    Ipv6,
}

#[derive(Parser)]
struct Args {
    family: Family,

    /// the server's host name or address; defaults to the loopback address of the chosen family
    hostname: Option<String>,

    #[clap(long, default_value = "data/grafo_amazonia_legal.txt")]
    graph: String,

    #[clap(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// queue team orders that arrive during a mission instead of dropping them
    #[clap(long, default_value_t = false)]
    queue_orders: bool,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    let address_family = match args.family {
        Family::Ipv4 => AddressFamily::Ipv4,
        Family::Ipv6 => AddressFamily::Ipv6,
    };
    let hostname = args.hostname.as_deref()
        .unwrap_or(address_family.default_server_host());
    let server_addr = resolve_server_addr(hostname, args.port, address_family).await?;

    let mut config = ClientConfig::new(server_addr);
    if args.queue_orders {
        config.order_conflict_policy = OrderConflictPolicy::Queue;
    }

    let graph = Arc::new(load_graph(&args.graph)?);
    let injector = Arc::new(RandomFaultInjector::new(config.alert_probability, config.mission_duration_secs.clone())?);
    let messaging = Arc::new(UdpMessaging::bind_client(address_family).await?);

    select! {
        result = run_client(Arc::new(config), graph, messaging, injector) => { result }
        result = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(result?)
        }
    }
}
