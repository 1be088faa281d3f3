pub mod client_config;
pub mod fault_injector;
pub mod inbound_dispatcher;
pub mod mission;
pub mod mission_executor;
pub mod status_sampler;
pub mod telemetry_reporter;
pub mod wildfire_client;
