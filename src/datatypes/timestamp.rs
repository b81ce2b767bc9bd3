// Service-centre timestamp, TS 23.040 9.2.3.11
// Seven swapped-nibble BCD octets; the last carries a signed quarter-hour zone

use crate::codec::{CodecError, decode_u8};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// Service centre time stamp. The timezone is in quarter-hour steps from
/// GMT, negative west of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scts {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub timezone: i8,
}

fn bcd_swapped(value: u8) -> u8 {
    (value / 10) | ((value % 10) << 4)
}

fn from_bcd_swapped(octet: u8) -> u8 {
    (octet & 0x0F) * 10 + (octet >> 4)
}

impl Scts {
    /// Decodes without range checks; garbage timestamps do occur on the wire
    /// and the surrounding fields still need to parse.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Scts, CodecError> {
        let year = from_bcd_swapped(decode_u8(buf)?);
        let month = from_bcd_swapped(decode_u8(buf)?);
        let day = from_bcd_swapped(decode_u8(buf)?);
        let hour = from_bcd_swapped(decode_u8(buf)?);
        let minute = from_bcd_swapped(decode_u8(buf)?);
        let second = from_bcd_swapped(decode_u8(buf)?);

        let oct = decode_u8(buf)?;
        let mut timezone = ((oct & 0x07) * 10 + (oct >> 4)) as i8;
        if oct & 0x08 != 0 {
            timezone = -timezone;
        }

        Ok(Scts {
            year,
            month,
            day,
            hour,
            minute,
            second,
            timezone,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        buf.put_u8(bcd_swapped(self.year));
        buf.put_u8(bcd_swapped(self.month));
        buf.put_u8(bcd_swapped(self.day));
        buf.put_u8(bcd_swapped(self.hour));
        buf.put_u8(bcd_swapped(self.minute));
        buf.put_u8(bcd_swapped(self.second));

        let abs = self.timezone.unsigned_abs();
        let mut oct = (abs / 10) | ((abs % 10) << 4);
        if self.timezone < 0 {
            oct |= 0x08;
        }
        buf.put_u8(oct);

        Ok(())
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        let check = |field, value: i32, min: i32, max: i32| {
            if value < min || value > max {
                Err(CodecError::InvalidTimestamp { field, value })
            } else {
                Ok(())
            }
        };

        check("year", self.year.into(), 0, 99)?;
        check("month", self.month.into(), 1, 12)?;
        check("day", self.day.into(), 1, 31)?;
        check("hour", self.hour.into(), 0, 23)?;
        check("minute", self.minute.into(), 0, 59)?;
        check("second", self.second.into(), 0, 59)?;
        // +/- 14 hours in quarter-hour steps
        check("timezone", self.timezone.into(), -56, 56)?;

        Ok(())
    }
}
