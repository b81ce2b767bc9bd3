// SMS-STATUS-REPORT TPDU, TS 23.040 9.2.2.3

use crate::codec::{
    CodecError, UserData, decode_pi_tail, decode_u8, encode_pi_tail, pi_bits,
};
use crate::datatypes::{Address, DeliveryStatus, Scts};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusReport {
    /// More messages to send, inverted on the wire
    pub mms: bool,
    /// Report is the result of an SMS-COMMAND query
    pub srq: bool,
    pub udhi: bool,
    pub mr: u8,
    pub raddr: Address,
    pub scts: Scts,
    /// Discharge time
    pub dt: Scts,
    pub st: DeliveryStatus,
    pub pid: Option<u8>,
    pub dcs: Option<u8>,
    pub ud: Option<UserData>,
}

impl StatusReport {
    pub const UD_CAPACITY: usize = 143;

    pub(crate) fn decode(buf: &mut Cursor<&[u8]>) -> Result<StatusReport, CodecError> {
        let octet = decode_u8(buf)?;

        let mut report = StatusReport {
            mms: octet & 0x04 == 0,
            srq: octet & 0x20 != 0,
            udhi: octet & 0x40 != 0,
            mr: decode_u8(buf)?,
            raddr: Address::decode(buf, false)?,
            scts: Scts::decode(buf)?,
            dt: Scts::decode(buf)?,
            st: DeliveryStatus(decode_u8(buf)?),
            pid: None,
            dcs: None,
            ud: None,
        };

        // the parameter indicator and everything it gates are optional
        if buf.has_remaining() {
            let pi = decode_u8(buf)? & 0x07;
            let (pid, dcs, ud) = decode_pi_tail(buf, pi, Self::UD_CAPACITY)?;
            report.pid = pid;
            report.dcs = dcs;
            report.ud = ud;
        }

        Ok(report)
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let mut octet = 0x02;
        if !self.mms {
            octet |= 0x04;
        }
        if self.srq {
            octet |= 0x20;
        }
        if self.udhi {
            octet |= 0x40;
        }
        buf.put_u8(octet);

        buf.put_u8(self.mr);
        self.raddr.encode(buf, false)?;
        self.scts.encode(buf)?;
        self.dt.encode(buf)?;
        buf.put_u8(self.st.into());

        let pi = pi_bits(self.pid, self.dcs, self.ud.as_ref());
        if pi != 0 {
            buf.put_u8(pi);
            encode_pi_tail(buf, self.pid, self.dcs, self.ud.as_ref(), Self::UD_CAPACITY)?;
        }

        Ok(())
    }
}
