pub mod dispatch_server;
pub mod server_config;
