// SMS-COMMAND TPDU, TS 23.040 9.2.2.4

use crate::codec::{CodecError, decode_u8};
use crate::datatypes::Address;
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// Status report request
    pub srr: bool,
    pub udhi: bool,
    pub mr: u8,
    pub pid: u8,
    /// Command type, 9.2.3.19
    pub ct: u8,
    /// Message number the command operates on
    pub mn: u8,
    pub daddr: Address,
    /// Command data; always octets, the length octet is derived
    pub cd: Vec<u8>,
}

impl Command {
    pub const CD_CAPACITY: usize = 156;

    pub(crate) fn decode(buf: &mut Cursor<&[u8]>) -> Result<Command, CodecError> {
        let octet = decode_u8(buf)?;

        let command = Command {
            srr: octet & 0x20 != 0,
            udhi: octet & 0x40 != 0,
            mr: decode_u8(buf)?,
            pid: decode_u8(buf)?,
            ct: decode_u8(buf)?,
            mn: decode_u8(buf)?,
            daddr: Address::decode(buf, false)?,
            cd: Vec::new(),
        };

        let cdl = decode_u8(buf)? as usize;
        if cdl > Self::CD_CAPACITY {
            return Err(CodecError::UserDataTooLong {
                len: cdl,
                capacity: Self::CD_CAPACITY,
            });
        }
        if buf.remaining() < cdl {
            return Err(CodecError::Incomplete);
        }
        let mut cd = vec![0u8; cdl];
        buf.copy_to_slice(&mut cd);

        Ok(Command { cd, ..command })
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.cd.len() > Self::CD_CAPACITY {
            return Err(CodecError::UserDataTooLong {
                len: self.cd.len(),
                capacity: Self::CD_CAPACITY,
            });
        }

        let mut octet = 0x02;
        if self.srr {
            octet |= 0x20;
        }
        if self.udhi {
            octet |= 0x40;
        }
        buf.put_u8(octet);

        buf.put_u8(self.mr);
        buf.put_u8(self.pid);
        buf.put_u8(self.ct);
        buf.put_u8(self.mn);
        self.daddr.encode(buf, false)?;
        buf.put_u8(self.cd.len() as u8);
        buf.put_slice(&self.cd);

        Ok(())
    }
}
