use anyhow::{anyhow, bail};
use bytes::{Buf, BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::graph::MAX_CITIES;
use crate::messaging::message_header::{MessageHeader, MessageType};

const TELEMETRY_ENTRY_LEN: usize = 8;
/// Telemetry payload size of a report that carries all [MAX_CITIES] entries. Senders with a
///  fixed-array layout always send this size, padding after `total` entries.
pub const MAX_TELEMETRY_PAYLOAD_LEN: usize = 4 + MAX_CITIES * TELEMETRY_ENTRY_LEN;
pub const MAX_DATAGRAM_LEN: usize = MessageHeader::SERIALIZED_LEN + MAX_TELEMETRY_PAYLOAD_LEN;

const ACK_PAYLOAD_LEN: usize = 4;
const ASSIGNMENT_PAYLOAD_LEN: usize = 8;

const STATUS_OK: i32 = 0;
const STATUS_ALERT: i32 = 1;

#[repr(i32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum AckKind {
    Telemetry = 0,
    TeamOrder = 1,
    Completion = 2,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TelemetryEntry {
    pub city_id: i32,
    pub alert: bool,
}

/// Per-city alert flags as sampled by a client. Ids are raw wire values and must be validated
///  against the graph by the receiver.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct TelemetryReport {
    entries: Vec<TelemetryEntry>,
}
impl TelemetryReport {
    pub fn new(entries: Vec<TelemetryEntry>) -> anyhow::Result<TelemetryReport> {
        if entries.len() > MAX_CITIES {
            bail!("a telemetry report can hold at most {} entries, got {}", MAX_CITIES, entries.len());
        }
        Ok(TelemetryReport { entries })
    }

    pub fn entries(&self) -> &[TelemetryEntry] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn alerting_city_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter()
            .filter(|e| e.alert)
            .map(|e| e.city_id)
    }
}

/// A team assignment: used both for the server's order and for the client's completion report
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AssignmentData {
    pub city_id: i32,
    pub team_id: i32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WildfireMessage {
    Telemetry(TelemetryReport),
    Ack(AckKind),
    TeamOrder(AssignmentData),
    Completion(AssignmentData),
}

impl WildfireMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            WildfireMessage::Telemetry(_) => MessageType::Telemetry,
            WildfireMessage::Ack(_) => MessageType::Ack,
            WildfireMessage::TeamOrder(_) => MessageType::TeamOrder,
            WildfireMessage::Completion(_) => MessageType::Completion,
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            WildfireMessage::Telemetry(report) => 4 + report.total() * TELEMETRY_ENTRY_LEN,
            WildfireMessage::Ack(_) => ACK_PAYLOAD_LEN,
            WildfireMessage::TeamOrder(_) | WildfireMessage::Completion(_) => ASSIGNMENT_PAYLOAD_LEN,
        }
    }

    /// writes the complete datagram, i.e. header and payload
    pub fn ser(&self, buf: &mut BytesMut) {
        let payload_len = self.payload_len();
        buf.reserve(MessageHeader::SERIALIZED_LEN + payload_len);

        // at most MAX_TELEMETRY_PAYLOAD_LEN, which fits easily
        MessageHeader::new(self.message_type(), payload_len as u16).ser(buf);

        match self {
            WildfireMessage::Telemetry(report) => Self::ser_telemetry(report, buf),
            WildfireMessage::Ack(kind) => buf.put_i32((*kind).into()),
            WildfireMessage::TeamOrder(data) => Self::ser_assignment(data, buf),
            WildfireMessage::Completion(data) => Self::ser_assignment(data, buf),
        }
    }

    fn ser_telemetry(report: &TelemetryReport, buf: &mut impl BufMut) {
        buf.put_i32(report.total() as i32);
        for entry in report.entries() {
            buf.put_i32(entry.city_id);
            buf.put_i32(if entry.alert { STATUS_ALERT } else { STATUS_OK });
        }
    }

    fn ser_assignment(data: &AssignmentData, buf: &mut impl BufMut) {
        buf.put_i32(data.city_id);
        buf.put_i32(data.team_id);
    }

    /// Parses a complete datagram. Truncated datagrams, payload lengths that do not match the
    ///  message type, and unknown types or ack kinds are errors. Bytes after the declared
    ///  payload are ignored.
    pub fn deser(datagram: &[u8]) -> anyhow::Result<WildfireMessage> {
        let mut buf = datagram;
        let header = MessageHeader::deser(&mut buf)?;

        let length = header.length as usize;
        if buf.len() < length {
            bail!("declared payload length {} exceeds the {} bytes received", length, buf.len());
        }
        let payload = &buf[..length];

        let message_type = MessageType::try_from_primitive(header.message_type)
            .map_err(|_| anyhow!("unknown message type {}", header.message_type))?;

        match message_type {
            MessageType::Telemetry => Self::deser_telemetry(payload),
            MessageType::Ack => Self::deser_ack(payload),
            MessageType::TeamOrder => Ok(WildfireMessage::TeamOrder(Self::deser_assignment(payload)?)),
            MessageType::Completion => Ok(WildfireMessage::Completion(Self::deser_assignment(payload)?)),
        }
    }

    fn deser_telemetry(mut payload: &[u8]) -> anyhow::Result<WildfireMessage> {
        let payload_len = payload.len();
        let total = payload.try_get_i32()?;
        let total = usize::try_from(total).ok()
            .filter(|&n| n <= MAX_CITIES)
            .ok_or_else(|| anyhow!("telemetry total {} is outside [0, {}]", total, MAX_CITIES))?;

        let expected_len = 4 + total * TELEMETRY_ENTRY_LEN;
        if payload_len != expected_len && payload_len != MAX_TELEMETRY_PAYLOAD_LEN {
            bail!("telemetry payload with {} entries has length {}, expected {}", total, payload_len, expected_len);
        }

        let mut entries = Vec::with_capacity(total);
        for _ in 0..total {
            let city_id = payload.try_get_i32()?;
            let status = payload.try_get_i32()?;
            entries.push(TelemetryEntry {
                city_id,
                alert: status == STATUS_ALERT,
            });
        }
        Ok(WildfireMessage::Telemetry(TelemetryReport { entries }))
    }

    fn deser_ack(mut payload: &[u8]) -> anyhow::Result<WildfireMessage> {
        Self::check_fixed_len(payload, ACK_PAYLOAD_LEN, "ack")?;
        let raw = payload.try_get_i32()?;
        let kind = AckKind::try_from_primitive(raw)
            .map_err(|_| anyhow!("unknown ack status {}", raw))?;
        Ok(WildfireMessage::Ack(kind))
    }

    fn deser_assignment(mut payload: &[u8]) -> anyhow::Result<AssignmentData> {
        Self::check_fixed_len(payload, ASSIGNMENT_PAYLOAD_LEN, "assignment")?;
        let city_id = payload.try_get_i32()?;
        let team_id = payload.try_get_i32()?;
        Ok(AssignmentData { city_id, team_id })
    }

    fn check_fixed_len(payload: &[u8], expected: usize, what: &str) -> anyhow::Result<()> {
        if payload.len() != expected {
            bail!("{} payload has length {}, expected {}", what, payload.len(), expected);
        }
        Ok(())
    }
}
