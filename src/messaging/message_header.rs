use bytes::{Buf, BufMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[repr(u16)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum MessageType {
    Telemetry = 1,
    Ack = 2,
    TeamOrder = 3,
    Completion = 4,
}

/// Every datagram starts with this header. `length` is the number of payload bytes following
///  the header; both fields are in network byte order.
///
/// `message_type` is kept raw here so that datagrams of unknown type can still be reported by
///  their type number.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MessageHeader {
    pub message_type: u16,
    pub length: u16,
}

impl MessageHeader {
    pub const SERIALIZED_LEN: usize = 4;

    pub fn new(message_type: MessageType, length: u16) -> MessageHeader {
        MessageHeader {
            message_type: message_type.into(),
            length,
        }
    }

    pub fn ser(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.message_type);
        buf.put_u16(self.length);
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<MessageHeader> {
        let message_type = buf.try_get_u16()?;
        let length = buf.try_get_u16()?;
        Ok(MessageHeader {
            message_type,
            length,
        })
    }
}
