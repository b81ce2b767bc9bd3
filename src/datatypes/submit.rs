// SMS-SUBMIT (9.2.2.2) and SMS-SUBMIT-REPORT (9.2.2.2a) TPDUs

use crate::codec::{
    CodecError, Tpdu, UserData, decode_pi_tail, decode_u8, decode_user_data, encode_pi_tail,
    encode_user_data, pi_bits,
};
use crate::datatypes::{Address, Scts, ValidityPeriod};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Submit {
    /// Reject duplicates
    pub rd: bool,
    /// Status report request
    pub srr: bool,
    pub udhi: bool,
    /// Reply path
    pub rp: bool,
    pub mr: u8,
    pub daddr: Address,
    pub pid: u8,
    pub dcs: u8,
    pub vp: ValidityPeriod,
    pub ud: UserData,
}

impl Submit {
    pub const UD_CAPACITY: usize = 140;

    pub(crate) fn decode(buf: &mut Cursor<&[u8]>) -> Result<Submit, CodecError> {
        let octet = decode_u8(buf)?;
        let vpf = (octet >> 3) & 0x03;

        let submit = Submit {
            rd: octet & 0x04 != 0,
            srr: octet & 0x20 != 0,
            udhi: octet & 0x40 != 0,
            rp: octet & 0x80 != 0,
            mr: decode_u8(buf)?,
            daddr: Address::decode(buf, false)?,
            pid: decode_u8(buf)?,
            dcs: decode_u8(buf)?,
            vp: ValidityPeriod::Absent,
            ud: UserData::default(),
        };

        let vp = ValidityPeriod::decode(buf, vpf)?;
        let ud = decode_user_data(buf, submit.dcs, Self::UD_CAPACITY)?;

        Ok(Submit { vp, ud, ..submit })
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let mut octet = 0x01;
        if self.rd {
            octet |= 0x04;
        }
        octet |= self.vp.format() << 3;
        if self.srr {
            octet |= 0x20;
        }
        if self.udhi {
            octet |= 0x40;
        }
        if self.rp {
            octet |= 0x80;
        }
        buf.put_u8(octet);

        buf.put_u8(self.mr);
        self.daddr.encode(buf, false)?;
        buf.put_u8(self.pid);
        buf.put_u8(self.dcs);
        self.vp.encode(buf)?;
        encode_user_data(buf, &self.ud, self.dcs, Self::UD_CAPACITY)
    }
}

/// Positive SMS-SUBMIT-REPORT, sent in RP-ACK
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitAckReport {
    pub udhi: bool,
    pub scts: Scts,
    pub pid: Option<u8>,
    pub dcs: Option<u8>,
    pub ud: Option<UserData>,
}

/// Negative SMS-SUBMIT-REPORT, sent in RP-ERROR with a failure cause
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitErrReport {
    pub udhi: bool,
    pub fcs: u8,
    pub scts: Scts,
    pub pid: Option<u8>,
    pub dcs: Option<u8>,
    pub ud: Option<UserData>,
}

impl SubmitAckReport {
    pub const UD_CAPACITY: usize = 152;

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(if self.udhi { 0x41 } else { 0x01 });
        buf.put_u8(pi_bits(self.pid, self.dcs, self.ud.as_ref()));
        self.scts.encode(buf)?;
        encode_pi_tail(buf, self.pid, self.dcs, self.ud.as_ref(), Self::UD_CAPACITY)
    }
}

impl SubmitErrReport {
    pub const UD_CAPACITY: usize = 151;

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u8(if self.udhi { 0x41 } else { 0x01 });
        buf.put_u8(self.fcs);
        buf.put_u8(pi_bits(self.pid, self.dcs, self.ud.as_ref()));
        self.scts.encode(buf)?;
        encode_pi_tail(buf, self.pid, self.dcs, self.ud.as_ref(), Self::UD_CAPACITY)
    }
}

/// The ack and error forms share a message type; a failure cause always has
/// the high bit set while a parameter indicator never does.
pub(crate) fn decode_submit_report(buf: &mut Cursor<&[u8]>) -> Result<Tpdu, CodecError> {
    let octet = decode_u8(buf)?;
    let udhi = octet & 0x40 != 0;
    let second = decode_u8(buf)?;

    if second & 0x80 != 0 {
        let pi = decode_u8(buf)? & 0x07;
        let scts = Scts::decode(buf)?;
        let (pid, dcs, ud) = decode_pi_tail(buf, pi, SubmitErrReport::UD_CAPACITY)?;
        Ok(Tpdu::SubmitReportError(SubmitErrReport {
            udhi,
            fcs: second,
            scts,
            pid,
            dcs,
            ud,
        }))
    } else {
        let scts = Scts::decode(buf)?;
        let (pid, dcs, ud) = decode_pi_tail(buf, second & 0x07, SubmitAckReport::UD_CAPACITY)?;
        Ok(Tpdu::SubmitReportAck(SubmitAckReport {
            udhi,
            scts,
            pid,
            dcs,
            ud,
        }))
    }
}
