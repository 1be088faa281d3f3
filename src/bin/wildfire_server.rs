use std::sync::Arc;

use clap::Parser;
use clap_derive::{Parser, ValueEnum};
use tokio::select;
use tracing::{info, Level};

use wildfire_dispatch::graph::graph_loader::load_graph;
use wildfire_dispatch::messaging::udp_messaging::{AddressFamily, UdpMessaging};
use wildfire_dispatch::server::dispatch_server::run_server;
use wildfire_dispatch::server::server_config::{ServerConfig, DEFAULT_PORT};

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

    #[clap(long, default_value = "data/grafo_amazonia_legal.txt")]
    graph: String,

    #[clap(long, default_value_t = DEFAULT_PORT)]
    port: u16,

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
    let mut config = ServerConfig::new(address_family);
    config.port = args.port;

    let graph = Arc::new(load_graph(&args.graph)?);
    let messaging = Arc::new(UdpMessaging::bind_server(config.address_family, config.port)?);

    select! {
        result = run_server(Arc::new(config), graph, messaging) => { result }
        result = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(result?)
        }
    }
}
