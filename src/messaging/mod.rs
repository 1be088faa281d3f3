pub mod message_header;
pub mod messages;
pub mod messaging;
pub mod udp_messaging;
