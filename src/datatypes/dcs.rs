// TS 23.038 data coding scheme decoders for SMS and cell broadcast
// Also derives the octet length of a user-data field from UDL + DCS

use crate::codec::CodecError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Charset {
    #[default]
    Gsm7Bit = 0,
    EightBit = 1,
    Ucs2 = 2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageClass {
    Class0 = 0,
    Class1 = 1,
    Class2 = 2,
    Class3 = 3,
}

/// General data coding groups, 23.038 section 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsDataCoding {
    pub compressed: bool,
    pub autodelete: bool,
    pub class: Option<MessageClass>,
    pub charset: Charset,
}

impl SmsDataCoding {
    pub fn decode(dcs: u8) -> Result<SmsDataCoding, CodecError> {
        let upper = (dcs & 0xF0) >> 4;

        // the MWI groups and the reserved groups are not general coding
        if (0x8..0xF).contains(&upper) {
            return Err(CodecError::InvalidDataCoding(dcs));
        }

        match (dcs & 0xC0) >> 6 {
            0 | 1 => {
                let charset_bits = (dcs & 0x0C) >> 2;
                let charset = Charset::try_from(charset_bits)
                    .map_err(|_| CodecError::InvalidDataCoding(dcs))?;
                let class = if dcs & 0x10 != 0 {
                    MessageClass::try_from(dcs & 0x03).ok()
                } else {
                    None
                };
                Ok(SmsDataCoding {
                    compressed: dcs & 0x20 != 0,
                    autodelete: (dcs & 0x40) != 0,
                    class,
                    charset,
                })
            }
            3 => Ok(SmsDataCoding {
                compressed: false,
                autodelete: false,
                class: MessageClass::try_from(dcs & 0x03).ok(),
                charset: if dcs & 0x04 != 0 {
                    Charset::EightBit
                } else {
                    Charset::Gsm7Bit
                },
            }),
            _ => Err(CodecError::InvalidDataCoding(dcs)),
        }
    }

    pub fn encode(&self) -> u8 {
        let mut dcs = 0u8;
        if self.autodelete {
            dcs |= 0x40;
        }
        if self.compressed {
            dcs |= 0x20;
        }
        if let Some(class) = self.class {
            dcs |= 0x10 | u8::from(class);
        }
        dcs | (u8::from(self.charset) << 2)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MwiType {
    Voicemail = 0,
    Fax = 1,
    Email = 2,
    Other = 3,
}

/// Message waiting indication groups, DCS 0xC0-0xEF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwiDataCoding {
    pub mwi_type: MwiType,
    pub charset: Charset,
    pub active: bool,
    pub discard: bool,
}

impl MwiDataCoding {
    pub fn decode(dcs: u8) -> Result<MwiDataCoding, CodecError> {
        let upper = (dcs & 0xF0) >> 4;
        if !(0xC..=0xE).contains(&upper) {
            return Err(CodecError::InvalidDataCoding(dcs));
        }

        let group = (dcs & 0x30) >> 4;
        let mwi_type = MwiType::try_from(dcs & 0x03)
            .map_err(|_| CodecError::InvalidDataCoding(dcs))?;

        Ok(MwiDataCoding {
            mwi_type,
            charset: if group == 2 {
                Charset::Ucs2
            } else {
                Charset::Gsm7Bit
            },
            active: dcs & 0x08 != 0,
            discard: group == 0,
        })
    }
}

/// CBS message languages, 23.038 section 5
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CbsLanguage {
    German = 0x00,
    English = 0x01,
    Italian = 0x02,
    French = 0x03,
    Spanish = 0x04,
    Dutch = 0x05,
    Swedish = 0x06,
    Danish = 0x07,
    Portuguese = 0x08,
    Finnish = 0x09,
    Norwegian = 0x0A,
    Greek = 0x0B,
    Turkish = 0x0C,
    Hungarian = 0x0D,
    Polish = 0x0E,
    Unspecified = 0x0F,
    Czech = 0x20,
    Hebrew = 0x21,
    Arabic = 0x22,
    Russian = 0x23,
    Icelandic = 0x24,
}

impl CbsLanguage {
    /// ISO 639-1 code, when one exists
    pub fn iso639(self) -> Option<&'static str> {
        match self {
            CbsLanguage::German => Some("de"),
            CbsLanguage::English => Some("en"),
            CbsLanguage::Italian => Some("it"),
            CbsLanguage::French => Some("fr"),
            CbsLanguage::Spanish => Some("es"),
            CbsLanguage::Dutch => Some("nl"),
            CbsLanguage::Swedish => Some("sv"),
            CbsLanguage::Danish => Some("da"),
            CbsLanguage::Portuguese => Some("pt"),
            CbsLanguage::Finnish => Some("fi"),
            CbsLanguage::Norwegian => Some("no"),
            CbsLanguage::Greek => Some("el"),
            CbsLanguage::Turkish => Some("tr"),
            CbsLanguage::Hungarian => Some("hu"),
            CbsLanguage::Polish => Some("pl"),
            CbsLanguage::Unspecified => None,
            CbsLanguage::Czech => Some("cs"),
            CbsLanguage::Hebrew => Some("he"),
            CbsLanguage::Arabic => Some("ar"),
            CbsLanguage::Russian => Some("ru"),
            CbsLanguage::Icelandic => Some("is"),
        }
    }
}

/// Cell broadcast data coding, 23.038 section 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbsDataCoding {
    pub udhi: bool,
    pub compressed: bool,
    pub class: Option<MessageClass>,
    pub charset: Charset,
    pub language: Option<CbsLanguage>,
    /// Text starts with an ISO 639 language prefix
    pub iso639: bool,
}

impl CbsDataCoding {
    pub fn decode(dcs: u8) -> Result<CbsDataCoding, CodecError> {
        let mut coding = CbsDataCoding {
            udhi: false,
            compressed: false,
            class: None,
            charset: Charset::Gsm7Bit,
            language: None,
            iso639: false,
        };

        match (dcs & 0xF0) >> 4 {
            0x0 => {
                coding.language = CbsLanguage::try_from(dcs).ok();
            }
            0x1 => {
                match dcs & 0x0F {
                    0 => {}
                    1 => coding.charset = Charset::Ucs2,
                    _ => return Err(CodecError::InvalidDataCoding(dcs)),
                }
                coding.iso639 = true;
            }
            0x2 => {
                if dcs > 0x24 {
                    return Err(CodecError::InvalidDataCoding(dcs));
                }
                coding.language = CbsLanguage::try_from(dcs).ok();
            }
            // reserved for other languages, default alphabet
            0x3 => {}
            0x4..=0x7 => {
                coding.compressed = dcs & 0x20 != 0;
                if dcs & 0x10 != 0 {
                    coding.class = MessageClass::try_from(dcs & 0x03).ok();
                }
                coding.charset = Charset::try_from((dcs & 0x0C) >> 2)
                    .map_err(|_| CodecError::InvalidDataCoding(dcs))?;
            }
            0x9 => {
                coding.udhi = true;
                coding.class = MessageClass::try_from(dcs & 0x03).ok();
                coding.charset = Charset::try_from((dcs & 0x0C) >> 2)
                    .map_err(|_| CodecError::InvalidDataCoding(dcs))?;
            }
            0xF => {
                if dcs & 0x04 != 0 {
                    coding.charset = Charset::EightBit;
                }
                coding.class = MessageClass::try_from(dcs & 0x03).ok();
            }
            _ => return Err(CodecError::InvalidDataCoding(dcs)),
        }

        Ok(coding)
    }
}

/// Octets occupied by a user-data field of `udl` units under `dcs`. Septets
/// for the 7-bit charsets, octets for everything else; reserved groups yield
/// zero.
pub fn udl_in_bytes(udl: u8, dcs: u8) -> usize {
    let udl = udl as usize;
    let len_7bit = (udl * 7).div_ceil(8);

    if dcs == 0 {
        return len_7bit;
    }

    match (dcs & 0xC0) >> 6 {
        0 | 1 => {
            if dcs & 0x20 != 0 {
                return udl;
            }
            if (dcs & 0x0C) >> 2 == 0 {
                len_7bit
            } else {
                udl
            }
        }
        2 => 0,
        _ => match (dcs & 0x30) >> 4 {
            0 | 1 => len_7bit,
            2 => udl,
            _ => {
                if dcs & 0x04 != 0 {
                    udl
                } else {
                    len_7bit
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_coding_groups() {
        let coding = SmsDataCoding::decode(0x00).unwrap();
        assert_eq!(coding.charset, Charset::Gsm7Bit);
        assert_eq!(coding.class, None);
        assert!(!coding.compressed && !coding.autodelete);

        let coding = SmsDataCoding::decode(0x08).unwrap();
        assert_eq!(coding.charset, Charset::Ucs2);

        let coding = SmsDataCoding::decode(0x51).unwrap();
        assert!(coding.autodelete);
        assert_eq!(coding.class, Some(MessageClass::Class1));

        // group F: charset from bit 2, class always present
        let coding = SmsDataCoding::decode(0xF6).unwrap();
        assert_eq!(coding.charset, Charset::EightBit);
        assert_eq!(coding.class, Some(MessageClass::Class2));
    }

    #[test]
    fn reserved_codings_rejected() {
        assert!(SmsDataCoding::decode(0x80).is_err());
        assert!(SmsDataCoding::decode(0xC0).is_err());
        // charset bits 11 are reserved in groups 0/1
        assert!(SmsDataCoding::decode(0x0C).is_err());
    }

    #[test]
    fn mwi_coding() {
        // discard, voicemail active
        let mwi = MwiDataCoding::decode(0xC8).unwrap();
        assert!(mwi.discard && mwi.active);
        assert_eq!(mwi.mwi_type, MwiType::Voicemail);
        assert_eq!(mwi.charset, Charset::Gsm7Bit);

        // UCS-2 store, email
        let mwi = MwiDataCoding::decode(0xE2).unwrap();
        assert!(!mwi.discard);
        assert_eq!(mwi.charset, Charset::Ucs2);
        assert_eq!(mwi.mwi_type, MwiType::Email);

        assert!(MwiDataCoding::decode(0x10).is_err());
    }

    #[test]
    fn cbs_coding() {
        let coding = CbsDataCoding::decode(0x01).unwrap();
        assert_eq!(coding.language, Some(CbsLanguage::English));
        assert_eq!(coding.charset, Charset::Gsm7Bit);
        assert!(!coding.iso639);

        let coding = CbsDataCoding::decode(0x11).unwrap();
        assert_eq!(coding.charset, Charset::Ucs2);
        assert!(coding.iso639);

        let coding = CbsDataCoding::decode(0x23).unwrap();
        assert_eq!(coding.language, Some(CbsLanguage::Russian));

        assert!(CbsDataCoding::decode(0x25).is_err());
        assert!(CbsDataCoding::decode(0xA0).is_err());
    }

    #[test]
    fn udl_octet_lengths() {
        assert_eq!(udl_in_bytes(160, 0x00), 140);
        assert_eq!(udl_in_bytes(10, 0x00), 9);
        assert_eq!(udl_in_bytes(140, 0x04), 140);
        assert_eq!(udl_in_bytes(140, 0x08), 140);
        // compressed always counts octets
        assert_eq!(udl_in_bytes(100, 0x20), 100);
        // MWI discard group is 7-bit
        assert_eq!(udl_in_bytes(8, 0xC8), 7);
        // reserved group 2
        assert_eq!(udl_in_bytes(100, 0x90), 0);
    }
}
