pub mod client;
pub mod dispatch;
pub mod graph;
pub mod messaging;
pub mod server;
pub mod test_util;
