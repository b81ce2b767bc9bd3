// SMS-DELIVER (9.2.2.1) and SMS-DELIVER-REPORT (9.2.2.1a) TPDUs

use crate::codec::{
    CodecError, Tpdu, UserData, decode_pi_tail, decode_u8, decode_user_data, encode_pi_tail,
    encode_user_data, pi_bits,
};
use crate::datatypes::{Address, Scts};
use bytes::BufMut;
use bytes::BytesMut;
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deliver {
    /// More messages to send, inverted on the wire
    pub mms: bool,
    /// Status report indication
    pub sri: bool,
    pub udhi: bool,
    /// Reply path
    pub rp: bool,
    pub oaddr: Address,
    pub pid: u8,
    pub dcs: u8,
    pub scts: Scts,
    pub ud: UserData,
}

impl Deliver {
    pub const UD_CAPACITY: usize = 140;

    pub(crate) fn decode(buf: &mut Cursor<&[u8]>) -> Result<Deliver, CodecError> {
        let octet = decode_u8(buf)?;

        let deliver = Deliver {
            mms: octet & 0x04 == 0,
            sri: octet & 0x20 != 0,
            udhi: octet & 0x40 != 0,
            rp: octet & 0x80 != 0,
            oaddr: Address::decode(buf, false)?,
            pid: decode_u8(buf)?,
            dcs: decode_u8(buf)?,
            scts: Scts::decode(buf)?,
            ud: UserData::default(),
        };

        Ok(Deliver {
            ud: decode_user_data(buf, deliver.dcs, Self::UD_CAPACITY)?,
            ..deliver
        })
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let mut octet = 0u8;
        if !self.mms {
            octet |= 0x04;
        }
        if self.sri {
            octet |= 0x20;
        }
        if self.udhi {
            octet |= 0x40;
        }
        if self.rp {
            octet |= 0x80;
        }
        buf.put_u8(octet);

        self.oaddr.encode(buf, false)?;
        buf.put_u8(self.pid);
        buf.put_u8(self.dcs);
        self.scts.encode(buf)?;
        encode_user_data(buf, &self.ud, self.dcs, Self::UD_CAPACITY)
    }
}

/// Positive SMS-DELIVER-REPORT, sent in RP-ACK
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliverAckReport {
    pub udhi: bool,
    pub pid: Option<u8>,
    pub dcs: Option<u8>,
    pub ud: Option<UserData>,
}

/// Negative SMS-DELIVER-REPORT, sent in RP-ERROR with a failure cause
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliverErrReport {
    pub udhi: bool,
    pub fcs: u8,
    pub pid: Option<u8>,
    pub dcs: Option<u8>,
    pub ud: Option<UserData>,
}

impl DeliverAckReport {
    pub const UD_CAPACITY: usize = 159;

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(if self.udhi { 0x40 } else { 0x00 });
        buf.put_u8(pi_bits(self.pid, self.dcs, self.ud.as_ref()));
        encode_pi_tail(buf, self.pid, self.dcs, self.ud.as_ref(), Self::UD_CAPACITY)
    }
}

impl DeliverErrReport {
    pub const UD_CAPACITY: usize = 158;

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(if self.udhi { 0x40 } else { 0x00 });
        buf.put_u8(self.fcs);
        buf.put_u8(pi_bits(self.pid, self.dcs, self.ud.as_ref()));
        encode_pi_tail(buf, self.pid, self.dcs, self.ud.as_ref(), Self::UD_CAPACITY)
    }
}

/// The ack and error forms share a message type; a failure cause always has
/// the high bit set while a parameter indicator never does.
pub(crate) fn decode_deliver_report(buf: &mut Cursor<&[u8]>) -> Result<Tpdu, CodecError> {
    let octet = decode_u8(buf)?;
    let udhi = octet & 0x40 != 0;
    let second = decode_u8(buf)?;

    if second & 0x80 != 0 {
        let pi = decode_u8(buf)? & 0x07;
        let (pid, dcs, ud) = decode_pi_tail(buf, pi, DeliverErrReport::UD_CAPACITY)?;
        Ok(Tpdu::DeliverReportError(DeliverErrReport {
            udhi,
            fcs: second,
            pid,
            dcs,
            ud,
        }))
    } else {
        let (pid, dcs, ud) = decode_pi_tail(buf, second & 0x07, DeliverAckReport::UD_CAPACITY)?;
        Ok(Tpdu::DeliverReportAck(DeliverAckReport {
            udhi,
            pid,
            dcs,
            ud,
        }))
    }
}
