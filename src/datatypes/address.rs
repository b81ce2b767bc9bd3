// TS 23.040 9.1.2.5 address field with semi-octet BCD and GSM 7-bit forms
// Handles both the SC form (octet-counted) and the TPDU form (digit-counted)

use crate::charset::{self, GsmDialect};
use crate::codec::{self, CodecError, decode_u8};
use bytes::{Buf, BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::io::Cursor;

pub const MAX_ADDRESS_DIGITS: usize = 20;
pub const MAX_ALNUM_CHARS: usize = 11;

const DIGIT_LUT: &[u8; 15] = b"0123456789*#abc";

/// Type of number, bits 4-6 of the address type octet
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum NumberType {
    #[default]
    Unknown = 0,
    International = 1,
    National = 2,
    NetworkSpecific = 3,
    Subscriber = 4,
    Alphanumeric = 5,
    Abbreviated = 6,
    Reserved = 7,
}

/// Numbering plan identification, bits 0-3 of the address type octet.
/// The spare codepoints fold into `Reserved` and re-encode as 15.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum NumberingPlan {
    Unknown = 0,
    #[default]
    Isdn = 1,
    Data = 3,
    Telex = 4,
    ServiceCentre1 = 5,
    ServiceCentre2 = 6,
    National = 8,
    Private = 9,
    Ermes = 10,
    #[num_enum(alternatives = [2, 7, 11, 12, 13, 14])]
    Reserved = 15,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Address {
    pub number_type: NumberType,
    pub numbering_plan: NumberingPlan,
    pub address: String,
}

fn digit_to_semi_octet(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        '*' => Some(10),
        '#' => Some(11),
        'a' | 'A' => Some(12),
        'b' | 'B' => Some(13),
        'c' | 'C' => Some(14),
        _ => None,
    }
}

impl Address {
    /// Decodes an address field. In the SC form the length octet counts the
    /// octets that follow it; in the TPDU form it counts address digits. An
    /// SC length of zero means no address at all.
    pub fn decode(buf: &mut Cursor<&[u8]>, sc: bool) -> Result<Address, CodecError> {
        let addr_len = decode_u8(buf)? as usize;

        if sc && addr_len == 0 {
            return Ok(Address::default());
        }

        if !sc && addr_len > MAX_ADDRESS_DIGITS {
            return Err(CodecError::AddressTooLong {
                len: addr_len,
                max: MAX_ADDRESS_DIGITS,
            });
        }

        let addr_type = decode_u8(buf)?;

        let number_type = NumberType::try_from((addr_type >> 4) & 0x07)
            .map_err(|_| CodecError::InvalidAddressType(addr_type))?;
        let numbering_plan = NumberingPlan::try_from(addr_type & 0x0F)
            .map_err(|_| CodecError::InvalidAddressType(addr_type))?;

        let byte_len = if sc { addr_len - 1 } else { addr_len.div_ceil(2) };
        if buf.remaining() < byte_len {
            return Err(CodecError::Incomplete);
        }
        let raw = buf.copy_to_bytes(byte_len);

        let address = if number_type == NumberType::Alphanumeric {
            let chars = if sc { byte_len * 8 / 7 } else { addr_len * 4 / 7 };
            let septets = charset::unpack_7bit(&raw, 0, false, chars);
            let utf8 = charset::gsm_to_utf8(&septets, GsmDialect::Default, GsmDialect::Default);
            let decoded_chars = utf8.chars().count();
            if decoded_chars > MAX_ADDRESS_DIGITS {
                return Err(CodecError::AddressTooLong {
                    len: decoded_chars,
                    max: MAX_ADDRESS_DIGITS,
                });
            }
            utf8
        } else {
            let digits = if sc { byte_len * 2 } else { addr_len };
            let mut out = String::with_capacity(digits);
            'digits: for oct in raw.iter() {
                for nibble in [oct & 0x0F, oct >> 4] {
                    // 0xF is the filler nibble and ends the number
                    if out.len() == digits || nibble == 0x0F {
                        break 'digits;
                    }
                    out.push(char::from(DIGIT_LUT[usize::from(nibble)]));
                }
            }
            out
        };

        Ok(Address {
            number_type,
            numbering_plan,
            address,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut, sc: bool) -> Result<(), CodecError> {
        if sc && self.address.is_empty() {
            buf.put_u8(0);
            return Ok(());
        }

        let mut field = Vec::with_capacity(10);
        let addr_len;

        if self.number_type == NumberType::Alphanumeric {
            let chars = self.address.chars().count();
            if chars > MAX_ALNUM_CHARS {
                return Err(CodecError::AddressTooLong {
                    len: chars,
                    max: MAX_ALNUM_CHARS,
                });
            }

            let septets = charset::utf8_to_gsm(&self.address, GsmDialect::Default, GsmDialect::Default)
                .ok_or(CodecError::UnencodableText)?;
            field = charset::pack_7bit(&septets, 0, false);
            if field.len() > 10 {
                return Err(CodecError::AddressTooLong {
                    len: field.len(),
                    max: 10,
                });
            }

            addr_len = if sc {
                field.len() + 1
            } else {
                // length in semi-octets of the packed septets
                (septets.len() * 7).div_ceil(4)
            };
        } else {
            let digits = self.address.chars().count();
            if digits > MAX_ADDRESS_DIGITS {
                return Err(CodecError::AddressTooLong {
                    len: digits,
                    max: MAX_ADDRESS_DIGITS,
                });
            }

            for (i, c) in self.address.chars().enumerate() {
                let d = digit_to_semi_octet(c).ok_or(CodecError::InvalidAddressDigit(c))?;
                if i % 2 == 0 {
                    field.push(d);
                } else if let Some(last) = field.last_mut() {
                    *last |= d << 4;
                }
            }
            if digits % 2 == 1 {
                if let Some(last) = field.last_mut() {
                    *last |= 0xF0;
                }
            }

            addr_len = if sc { field.len() + 1 } else { digits };
        }

        buf.put_u8(addr_len as u8);
        buf.put_u8(0x80 | (u8::from(self.number_type) << 4) | u8::from(self.numbering_plan));
        buf.put_slice(&field);

        Ok(())
    }

    /// The TPDU-form address field as an uppercase hex string, used as a
    /// filesystem-safe key by the on-disk stores.
    pub fn to_hex_string(&self) -> Result<String, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf, false)?;
        Ok(codec::encode_hex(&buf))
    }

    pub fn from_hex_string(hex: &str) -> Result<Address, CodecError> {
        let raw = codec::decode_hex(hex).ok_or(CodecError::InvalidHex)?;
        let mut cur = Cursor::new(raw.as_slice());
        Address::decode(&mut cur, false)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.number_type == NumberType::International && !self.address.starts_with('+') {
            write!(f, "+{}", self.address)
        } else {
            f.write_str(&self.address)
        }
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Address {
        if let Some(rest) = s.strip_prefix('+') {
            Address {
                number_type: NumberType::International,
                numbering_plan: NumberingPlan::Isdn,
                address: rest.to_string(),
            }
        } else {
            Address {
                number_type: NumberType::Unknown,
                numbering_plan: NumberingPlan::Isdn,
                address: s.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(addr: &Address, sc: bool) -> Address {
        let mut buf = BytesMut::new();
        addr.encode(&mut buf, sc).unwrap();
        let mut cur = Cursor::new(&buf[..]);
        Address::decode(&mut cur, sc).unwrap()
    }

    #[test]
    fn bcd_even_digit_count() {
        let addr = Address::from("+358501234567");
        assert_eq!(addr.number_type, NumberType::International);
        assert_eq!(roundtrip(&addr, false), addr);
        assert_eq!(roundtrip(&addr, true), addr);
    }

    #[test]
    fn bcd_odd_digit_count_gets_filler() {
        let addr = Address::from("12345");
        let mut buf = BytesMut::new();
        addr.encode(&mut buf, false).unwrap();
        assert_eq!(&buf[..], &[0x05, 0x81, 0x21, 0x43, 0xF5]);
        assert_eq!(roundtrip(&addr, false), addr);
    }

    #[test]
    fn sc_form_counts_octets() {
        // "358405202090" as an SC address: 07 91 35 48 05 02 02 09
        let raw = [0x07, 0x91, 0x53, 0x48, 0x50, 0x02, 0x02, 0x09];
        let mut cur = Cursor::new(&raw[..]);
        let addr = Address::decode(&mut cur, true).unwrap();
        assert_eq!(addr.number_type, NumberType::International);
        assert_eq!(addr.address, "358405202090");
        assert_eq!(addr.to_string(), "+358405202090");
    }

    #[test]
    fn empty_sc_address() {
        let mut cur = Cursor::new(&[0x00u8][..]);
        let addr = Address::decode(&mut cur, true).unwrap();
        assert!(addr.address.is_empty());

        let mut buf = BytesMut::new();
        Address::default().encode(&mut buf, true).unwrap();
        assert_eq!(&buf[..], &[0x00]);
    }

    #[test]
    fn alphanumeric_sender() {
        let addr = Address {
            number_type: NumberType::Alphanumeric,
            numbering_plan: NumberingPlan::Unknown,
            address: "sipgate".to_string(),
        };
        assert_eq!(roundtrip(&addr, false), addr);
    }

    #[test]
    fn alphanumeric_too_long_rejected() {
        let addr = Address {
            number_type: NumberType::Alphanumeric,
            numbering_plan: NumberingPlan::Unknown,
            address: "twelve chars".to_string(),
        };
        let mut buf = BytesMut::new();
        assert!(matches!(
            addr.encode(&mut buf, false),
            Err(CodecError::AddressTooLong { .. })
        ));
    }

    #[test]
    fn rejects_bad_digit() {
        let addr = Address::from("12x4");
        let mut buf = BytesMut::new();
        assert!(matches!(
            addr.encode(&mut buf, false),
            Err(CodecError::InvalidAddressDigit('x'))
        ));
    }

    #[test]
    fn type_octet_high_bit_not_validated() {
        // the high bit of the type octet is ignored on decode
        let raw = [0x04, 0x11, 0x21, 0x43];
        let mut cur = Cursor::new(&raw[..]);
        let addr = Address::decode(&mut cur, false).unwrap();
        assert_eq!(addr.number_type, NumberType::International);
        assert_eq!(addr.address, "1234");
    }

    #[test]
    fn reserved_numbering_plans_fold() {
        assert_eq!(NumberingPlan::try_from(2), Ok(NumberingPlan::Reserved));
        assert_eq!(NumberingPlan::try_from(13), Ok(NumberingPlan::Reserved));
        assert_eq!(u8::from(NumberingPlan::Reserved), 15);
    }

    #[test]
    fn hex_string_key_roundtrip() {
        let addr = Address::from("+46708251358");
        let hex = addr.to_hex_string().unwrap();
        assert_eq!(Address::from_hex_string(&hex).unwrap(), addr);
    }
}
