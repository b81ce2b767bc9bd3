// 3GPP TS 23.040 TPDU codec - separates parsing/encoding logic from domain models
//
// This module provides the top-level `Sms` message type, the codec error type
// and the shared byte-level helpers. The wire layout of the individual TPDU
// variants lives next to their structs under `datatypes`.

use crate::datatypes::{
    Address, Command, Deliver, DeliverAckReport, DeliverErrReport, Scts, StatusReport, Submit,
    SubmitAckReport, SubmitErrReport, dcs::udl_in_bytes,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid message type octet: {0:#04x}")]
    InvalidMessageType(u8),

    #[error("Address field too long: {len} (max {max})")]
    AddressTooLong { len: usize, max: usize },

    #[error("Invalid address type octet: {0:#04x}")]
    InvalidAddressType(u8),

    #[error("Character {0:?} is not a valid address digit")]
    InvalidAddressDigit(char),

    #[error("Text is not representable in the GSM default alphabet")]
    UnencodableText,

    #[error("Reserved data coding scheme: {0:#04x}")]
    InvalidDataCoding(u8),

    #[error("Timestamp field '{field}' out of range: {value}")]
    InvalidTimestamp { field: &'static str, value: i32 },

    #[error("User data length {len} exceeds capacity {capacity}")]
    UserDataTooLong { len: usize, capacity: usize },

    #[error("Invalid hex string")]
    InvalidHex,

    #[error("Invalid CBS PDU length: {0} (expected 88)")]
    InvalidCbsLength(usize),

    #[error("Broadcast pages disagree on data coding")]
    MixedBroadcastPages,
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

pub fn encode_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        out.push_str(&format!("{b:02X}"));
    }
    out
}

pub fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Length-prefixed user data. `udl` counts septets for the 7-bit coding and
/// octets otherwise; `data` holds exactly the wire octets the length and the
/// coding scheme imply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserData {
    pub udl: u8,
    pub data: Vec<u8>,
}

pub(crate) fn decode_user_data(
    buf: &mut Cursor<&[u8]>,
    dcs: u8,
    capacity: usize,
) -> Result<UserData, CodecError> {
    let udl = decode_u8(buf)?;
    let expected = udl_in_bytes(udl, dcs);

    if expected > capacity {
        return Err(CodecError::UserDataTooLong {
            len: expected,
            capacity,
        });
    }

    if buf.remaining() < expected {
        return Err(CodecError::Incomplete);
    }

    let mut data = vec![0u8; expected];
    buf.copy_to_slice(&mut data);

    Ok(UserData { udl, data })
}

pub(crate) fn encode_user_data(
    buf: &mut BytesMut,
    ud: &UserData,
    dcs: u8,
    capacity: usize,
) -> Result<(), CodecError> {
    let expected = udl_in_bytes(ud.udl, dcs);

    if expected > capacity || ud.data.len() < expected {
        return Err(CodecError::UserDataTooLong {
            len: expected.max(ud.data.len()),
            capacity,
        });
    }

    buf.put_u8(ud.udl);
    buf.put_slice(&ud.data[..expected]);

    Ok(())
}

/// Decodes the parameter-indicator-gated tail (PID, DCS, UDL + UD) shared by
/// the four report variants.
pub(crate) fn decode_pi_tail(
    buf: &mut Cursor<&[u8]>,
    pi: u8,
    capacity: usize,
) -> Result<(Option<u8>, Option<u8>, Option<UserData>), CodecError> {
    let pid = if pi & 0x01 != 0 {
        Some(decode_u8(buf)?)
    } else {
        None
    };

    let dcs = if pi & 0x02 != 0 {
        Some(decode_u8(buf)?)
    } else {
        None
    };

    let ud = if pi & 0x04 != 0 {
        Some(decode_user_data(buf, dcs.unwrap_or(0), capacity)?)
    } else {
        None
    };

    Ok((pid, dcs, ud))
}

pub(crate) fn encode_pi_tail(
    buf: &mut BytesMut,
    pid: Option<u8>,
    dcs: Option<u8>,
    ud: Option<&UserData>,
    capacity: usize,
) -> Result<(), CodecError> {
    if let Some(pid) = pid {
        buf.put_u8(pid);
    }

    if let Some(dcs) = dcs {
        buf.put_u8(dcs);
    }

    if let Some(ud) = ud {
        encode_user_data(buf, ud, dcs.unwrap_or(0), capacity)?;
    }

    Ok(())
}

pub(crate) fn pi_bits(pid: Option<u8>, dcs: Option<u8>, ud: Option<&UserData>) -> u8 {
    let mut pi = 0;
    if pid.is_some() {
        pi |= 0x01;
    }
    if dcs.is_some() {
        pi |= 0x02;
    }
    if ud.is_some() {
        pi |= 0x04;
    }
    pi
}

/// The eight TPDU variants of 23.040 section 9.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tpdu {
    Deliver(Deliver),
    DeliverReportAck(DeliverAckReport),
    DeliverReportError(DeliverErrReport),
    StatusReport(StatusReport),
    Submit(Submit),
    SubmitReportAck(SubmitAckReport),
    SubmitReportError(SubmitErrReport),
    Command(Command),
}

/// A complete short message: an optional service-centre address prefix
/// followed by the TPDU.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sms {
    pub sc_addr: Address,
    pub tpdu: Tpdu,
}

impl Default for Tpdu {
    fn default() -> Self {
        Tpdu::Deliver(Deliver::default())
    }
}

/// Projection of the user-data-carrying fields shared by every TPDU variant.
/// `data` holds exactly the octets implied by `udl` and the coding scheme.
#[derive(Debug, Clone, Copy)]
pub struct UserDataView<'a> {
    pub udhi: bool,
    pub dcs: u8,
    pub udl: u8,
    pub capacity: usize,
    pub data: &'a [u8],
}

impl Sms {
    /// Decodes a service-centre PDU. The TPDU is the final `tpdu_len` octets;
    /// anything before it is the SC address in service-centre form. The low
    /// two bits of the first TPDU octet select the variant depending on the
    /// transfer direction.
    pub fn decode(pdu: &[u8], outgoing: bool, tpdu_len: usize) -> Result<Sms, CodecError> {
        if pdu.is_empty() {
            return Err(CodecError::Incomplete);
        }

        let mut cur = Cursor::new(pdu);

        let sc_addr = if tpdu_len < pdu.len() {
            Address::decode(&mut cur, true)?
        } else {
            Address::default()
        };

        let offset = cur.position() as usize;
        if pdu.len() - offset < tpdu_len {
            return Err(CodecError::Incomplete);
        }

        let tpdu_bytes = &pdu[offset..offset + tpdu_len];
        let first = *tpdu_bytes.first().ok_or(CodecError::Incomplete)?;
        let mut buf = Cursor::new(tpdu_bytes);

        let tpdu = match (outgoing, first & 0x03) {
            (false, 0) => Tpdu::Deliver(Deliver::decode(&mut buf)?),
            (false, 3) => {
                // 23.040 9.2.3.1: reserved is treated as deliver
                tracing::warn!(octet = first, "reserved message type, decoding as deliver");
                Tpdu::Deliver(Deliver::decode(&mut buf)?)
            }
            (false, 1) => crate::datatypes::submit::decode_submit_report(&mut buf)?,
            (false, 2) => Tpdu::StatusReport(StatusReport::decode(&mut buf)?),
            (true, 0) => crate::datatypes::deliver::decode_deliver_report(&mut buf)?,
            (true, 1) => Tpdu::Submit(Submit::decode(&mut buf)?),
            (true, 2) => Tpdu::Command(Command::decode(&mut buf)?),
            _ => return Err(CodecError::InvalidMessageType(first)),
        };

        Ok(Sms { sc_addr, tpdu })
    }

    /// Encodes the message, returning the full PDU and the TPDU length. Only
    /// deliver, submit and command PDUs carry the SC address prefix.
    pub fn encode(&self) -> Result<(Bytes, usize), CodecError> {
        let mut buf = BytesMut::new();

        if matches!(
            self.tpdu,
            Tpdu::Deliver(_) | Tpdu::Submit(_) | Tpdu::Command(_)
        ) {
            self.sc_addr.encode(&mut buf, true)?;
        }

        let tpdu_start = buf.len();

        match &self.tpdu {
            Tpdu::Deliver(t) => t.encode(&mut buf)?,
            Tpdu::DeliverReportAck(t) => t.encode(&mut buf)?,
            Tpdu::DeliverReportError(t) => t.encode(&mut buf)?,
            Tpdu::StatusReport(t) => t.encode(&mut buf)?,
            Tpdu::Submit(t) => t.encode(&mut buf)?,
            Tpdu::SubmitReportAck(t) => t.encode(&mut buf)?,
            Tpdu::SubmitReportError(t) => t.encode(&mut buf)?,
            Tpdu::Command(t) => t.encode(&mut buf)?,
        }

        let tpdu_len = buf.len() - tpdu_start;
        Ok((buf.freeze(), tpdu_len))
    }

    /// User-data projection common to every variant. Command PDUs report a
    /// DCS of zero; report variants without user data yield an empty view.
    pub fn user_data(&self) -> UserDataView<'_> {
        static EMPTY: UserData = UserData {
            udl: 0,
            data: Vec::new(),
        };

        match &self.tpdu {
            Tpdu::Deliver(t) => view(t.udhi, t.dcs, &t.ud, Deliver::UD_CAPACITY),
            Tpdu::DeliverReportAck(t) => view(
                t.udhi,
                t.dcs.unwrap_or(0),
                t.ud.as_ref().unwrap_or(&EMPTY),
                DeliverAckReport::UD_CAPACITY,
            ),
            Tpdu::DeliverReportError(t) => view(
                t.udhi,
                t.dcs.unwrap_or(0),
                t.ud.as_ref().unwrap_or(&EMPTY),
                DeliverErrReport::UD_CAPACITY,
            ),
            Tpdu::StatusReport(t) => view(
                t.udhi,
                t.dcs.unwrap_or(0),
                t.ud.as_ref().unwrap_or(&EMPTY),
                StatusReport::UD_CAPACITY,
            ),
            Tpdu::Submit(t) => view(t.udhi, t.dcs, &t.ud, Submit::UD_CAPACITY),
            Tpdu::SubmitReportAck(t) => view(
                t.udhi,
                t.dcs.unwrap_or(0),
                t.ud.as_ref().unwrap_or(&EMPTY),
                SubmitAckReport::UD_CAPACITY,
            ),
            Tpdu::SubmitReportError(t) => view(
                t.udhi,
                t.dcs.unwrap_or(0),
                t.ud.as_ref().unwrap_or(&EMPTY),
                SubmitErrReport::UD_CAPACITY,
            ),
            Tpdu::Command(t) => UserDataView {
                udhi: t.udhi,
                dcs: 0,
                udl: t.cd.len() as u8,
                capacity: Command::CD_CAPACITY,
                data: &t.cd,
            },
        }
    }

    /// Service-centre timestamp, for the variants that carry one.
    pub fn timestamp(&self) -> Option<&Scts> {
        match &self.tpdu {
            Tpdu::Deliver(t) => Some(&t.scts),
            Tpdu::StatusReport(t) => Some(&t.scts),
            Tpdu::SubmitReportAck(t) => Some(&t.scts),
            Tpdu::SubmitReportError(t) => Some(&t.scts),
            _ => None,
        }
    }
}

fn view<'a>(udhi: bool, dcs: u8, ud: &'a UserData, capacity: usize) -> UserDataView<'a> {
    UserDataView {
        udhi,
        dcs,
        udl: ud.udl,
        capacity,
        data: &ud.data,
    }
}
