// User data header walker and information element extractors
// TS 23.040 9.2.3.24; header validity is proven once at construction

use crate::codec::{Sms, UserDataView};
use num_enum::FromPrimitive;

/// Information element identifiers this crate interprets; everything else
/// is carried as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Iei {
    Concatenated8Bit = 0x00,
    SpecialMessageIndication = 0x01,
    ApplicationPort8Bit = 0x04,
    ApplicationPort16Bit = 0x05,
    SmscControlParameters = 0x06,
    UdhSourceIndicator = 0x07,
    Concatenated16Bit = 0x08,
    WirelessControlMessageProtocol = 0x09,
    TextFormatting = 0x0A,
    PredefinedSound = 0x0B,
    UserDefinedSound = 0x0C,
    PredefinedAnimation = 0x0D,
    LargeAnimation = 0x0E,
    SmallAnimation = 0x0F,
    LargePicture = 0x10,
    SmallPicture = 0x11,
    VariablePicture = 0x12,
    UserPromptIndicator = 0x13,
    ExtendedObject = 0x14,
    ReusedExtendedObject = 0x15,
    CompressionControl = 0x16,
    ObjectDistributionIndicator = 0x17,
    StandardWvg = 0x18,
    CharacterSizeWvg = 0x19,
    ExtendedObjectDataRequest = 0x1A,
    RfcLayer = 0x20,
    NationalLanguageSingleShift = 0x24,
    NationalLanguageLockingShift = 0x25,
    #[num_enum(catch_all)]
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InformationElement<'a> {
    pub iei: Iei,
    pub data: &'a [u8],
}

/// Iterator over the information elements of a user data header. `new`
/// validates the whole walk, so iteration itself cannot run off the end.
pub struct UdhIterator<'a> {
    hdr: &'a [u8],
    offset: usize,
}

impl<'a> UdhIterator<'a> {
    /// Returns `None` when the UDHI flag is clear or the header does not
    /// parse: too short, overruns the user data, or an element walk that
    /// does not land exactly on the declared header end.
    pub fn new(view: &UserDataView<'a>) -> Option<UdhIterator<'a>> {
        if !view.udhi {
            return None;
        }

        let data = view.data;
        if data.len() < 3 {
            return None;
        }

        let udh_len = data[0] as usize;
        if udh_len < 2 || udh_len >= data.len() {
            return None;
        }

        let end = udh_len + 1;
        let mut off = 1;
        while off < end {
            if off + 2 > end {
                return None;
            }
            let ie_len = data[off + 1] as usize;
            if off + 2 + ie_len > end {
                return None;
            }
            off += 2 + ie_len;
        }

        Some(UdhIterator {
            hdr: &data[..end],
            offset: 1,
        })
    }

    /// Header size in octets including the length octet itself
    pub fn total_octets(&self) -> usize {
        self.hdr.len()
    }
}

impl<'a> Iterator for UdhIterator<'a> {
    type Item = InformationElement<'a>;

    fn next(&mut self) -> Option<InformationElement<'a>> {
        if self.offset >= self.hdr.len() {
            return None;
        }

        let iei = Iei::from(self.hdr[self.offset]);
        let len = self.hdr[self.offset + 1] as usize;
        let data = &self.hdr[self.offset + 2..self.offset + 2 + len];
        self.offset += 2 + len;

        Some(InformationElement { iei, data })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concatenation {
    pub reference: u16,
    pub max_fragments: u8,
    pub sequence: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppPort {
    pub dst: u16,
    pub src: u16,
    pub is_8bit: bool,
}

/// Concatenation info, if any. Later occurrences override earlier ones.
pub fn extract_concatenation(sms: &Sms) -> Option<Concatenation> {
    let view = sms.user_data();
    let iter = UdhIterator::new(&view)?;
    let mut found = None;

    for ie in iter {
        match ie.iei {
            Iei::Concatenated8Bit if ie.data.len() == 3 => {
                let (max, seq) = (ie.data[1], ie.data[2]);
                if max == 0 || seq == 0 || seq > max {
                    continue;
                }
                found = Some(Concatenation {
                    reference: ie.data[0] as u16,
                    max_fragments: max,
                    sequence: seq,
                });
            }
            Iei::Concatenated16Bit if ie.data.len() == 4 => {
                let (max, seq) = (ie.data[2], ie.data[3]);
                if max == 0 || seq == 0 || seq > max {
                    continue;
                }
                found = Some(Concatenation {
                    reference: u16::from_be_bytes([ie.data[0], ie.data[1]]),
                    max_fragments: max,
                    sequence: seq,
                });
            }
            _ => {}
        }
    }

    found
}

/// Application port pair, if any. Later occurrences override earlier ones.
pub fn extract_app_port(sms: &Sms) -> Option<AppPort> {
    let view = sms.user_data();
    let iter = UdhIterator::new(&view)?;
    let mut found = None;

    for ie in iter {
        match ie.iei {
            Iei::ApplicationPort8Bit if ie.data.len() == 2 => {
                let (dst, src) = (ie.data[0] as u16, ie.data[1] as u16);
                // 8-bit ports below 240 are reserved
                if dst < 240 || src < 240 {
                    continue;
                }
                found = Some(AppPort {
                    dst,
                    src,
                    is_8bit: true,
                });
            }
            Iei::ApplicationPort16Bit if ie.data.len() == 4 => {
                let dst = u16::from_be_bytes([ie.data[0], ie.data[1]]);
                let src = u16::from_be_bytes([ie.data[2], ie.data[3]]);
                // 16-bit ports above 49151 are reserved
                if dst > 49151 || src > 49151 {
                    continue;
                }
                found = Some(AppPort {
                    dst,
                    src,
                    is_8bit: false,
                });
            }
            _ => {}
        }
    }

    found
}

/// National language shift variants: (locking, single). Later occurrences
/// override earlier ones.
pub fn extract_language_variant(sms: &Sms) -> (Option<u8>, Option<u8>) {
    let view = sms.user_data();
    let Some(iter) = UdhIterator::new(&view) else {
        return (None, None);
    };

    let mut locking = None;
    let mut single = None;

    for ie in iter {
        match ie.iei {
            Iei::NationalLanguageLockingShift if ie.data.len() == 1 => {
                locking = Some(ie.data[0]);
            }
            Iei::NationalLanguageSingleShift if ie.data.len() == 1 => {
                single = Some(ie.data[0]);
            }
            _ => {}
        }
    }

    (locking, single)
}
