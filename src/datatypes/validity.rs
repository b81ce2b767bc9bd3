// TP-Validity-Period field of SMS-SUBMIT, TS 23.040 9.2.3.12

use crate::codec::{CodecError, decode_u8};
use crate::datatypes::Scts;
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// Validity period in the three wire formats. The enhanced form is carried
/// opaquely; nothing downstream interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityPeriod {
    #[default]
    Absent,
    Enhanced([u8; 7]),
    Relative(u8),
    Absolute(Scts),
}

impl ValidityPeriod {
    /// The two-bit TP-VPF value for the submit first octet
    pub fn format(&self) -> u8 {
        match self {
            ValidityPeriod::Absent => 0,
            ValidityPeriod::Enhanced(_) => 1,
            ValidityPeriod::Relative(_) => 2,
            ValidityPeriod::Absolute(_) => 3,
        }
    }

    pub fn decode(buf: &mut Cursor<&[u8]>, vpf: u8) -> Result<ValidityPeriod, CodecError> {
        match vpf & 0x03 {
            0 => Ok(ValidityPeriod::Absent),
            1 => {
                if buf.remaining() < 7 {
                    return Err(CodecError::Incomplete);
                }
                let mut raw = [0u8; 7];
                buf.copy_to_slice(&mut raw);
                Ok(ValidityPeriod::Enhanced(raw))
            }
            2 => Ok(ValidityPeriod::Relative(decode_u8(buf)?)),
            _ => {
                let scts = Scts::decode(buf)?;
                scts.validate()?;
                Ok(ValidityPeriod::Absolute(scts))
            }
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            ValidityPeriod::Absent => Ok(()),
            ValidityPeriod::Enhanced(raw) => {
                buf.put_slice(raw);
                Ok(())
            }
            ValidityPeriod::Relative(units) => {
                buf.put_u8(*units);
                Ok(())
            }
            ValidityPeriod::Absolute(scts) => scts.encode(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_period() {
        let raw = [0xA7u8];
        let mut cur = Cursor::new(&raw[..]);
        let vp = ValidityPeriod::decode(&mut cur, 2).unwrap();
        assert_eq!(vp, ValidityPeriod::Relative(0xA7));
        assert_eq!(vp.format(), 2);
    }

    #[test]
    fn absent_consumes_nothing() {
        let raw = [0xFFu8];
        let mut cur = Cursor::new(&raw[..]);
        assert_eq!(
            ValidityPeriod::decode(&mut cur, 0).unwrap(),
            ValidityPeriod::Absent
        );
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn absolute_period_validated() {
        // month 13 in swapped BCD
        let raw = [0x62, 0x31, 0x10, 0x00, 0x00, 0x00, 0x00];
        let mut cur = Cursor::new(&raw[..]);
        assert!(matches!(
            ValidityPeriod::decode(&mut cur, 3),
            Err(CodecError::InvalidTimestamp { field: "month", .. })
        ));
    }
}
