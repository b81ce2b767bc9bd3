// Cell broadcast (TS 23.041) page codec, reassembly and text decode
// Page tracking is memory-only; stale updates are filtered per scope

use crate::charset::{self, GsmDialect};
use crate::codec::CodecError;
use crate::datatypes::{CbsDataCoding, Charset};

pub const CBS_PDU_LEN: usize = 88;
const CBS_UD_LEN: usize = 82;

/// Geographical scope, bits 6-7 of the serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoScope {
    CellImmediate,
    Plmn,
    ServiceArea,
    CellNormal,
}

impl GeoScope {
    fn from_bits(bits: u8) -> GeoScope {
        match bits & 0x03 {
            0 => GeoScope::CellImmediate,
            1 => GeoScope::Plmn,
            2 => GeoScope::ServiceArea,
            _ => GeoScope::CellNormal,
        }
    }

    fn bits(self) -> u8 {
        match self {
            GeoScope::CellImmediate => 0,
            GeoScope::Plmn => 1,
            GeoScope::ServiceArea => 2,
            GeoScope::CellNormal => 3,
        }
    }
}

/// One fixed 88-octet cell broadcast page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cbs {
    pub gs: GeoScope,
    /// 10-bit message code from the serial number
    pub message_code: u16,
    /// 4-bit update number from the serial number
    pub update_number: u8,
    pub message_identifier: u16,
    pub dcs: u8,
    pub max_pages: u8,
    pub page: u8,
    pub ud: [u8; CBS_UD_LEN],
}

impl Cbs {
    pub fn decode(pdu: &[u8]) -> Result<Cbs, CodecError> {
        if pdu.len() != CBS_PDU_LEN {
            return Err(CodecError::InvalidCbsLength(pdu.len()));
        }

        let mut ud = [0u8; CBS_UD_LEN];
        ud.copy_from_slice(&pdu[6..]);

        Ok(Cbs {
            gs: GeoScope::from_bits(pdu[0] >> 6),
            message_code: (u16::from(pdu[0] & 0x3F) << 4) | u16::from(pdu[1] >> 4),
            update_number: pdu[1] & 0x0F,
            message_identifier: u16::from_be_bytes([pdu[2], pdu[3]]),
            dcs: pdu[4],
            max_pages: pdu[5] & 0x0F,
            page: pdu[5] >> 4,
            ud,
        })
    }

    pub fn encode(&self) -> [u8; CBS_PDU_LEN] {
        let mut pdu = [0u8; CBS_PDU_LEN];
        pdu[0] = (self.gs.bits() << 6) | ((self.message_code >> 4) as u8 & 0x3F);
        pdu[1] = (((self.message_code & 0x0F) as u8) << 4) | (self.update_number & 0x0F);
        pdu[2..4].copy_from_slice(&self.message_identifier.to_be_bytes());
        pdu[4] = self.dcs;
        pdu[5] = (self.page << 4) | (self.max_pages & 0x0F);
        pdu[6..].copy_from_slice(&self.ud);
        pdu
    }

    /// Scope, code, update and identifier combined into one comparison key
    fn serial(&self) -> u32 {
        (u32::from(self.message_identifier) << 16)
            | (u32::from(self.gs.bits()) << 14)
            | (u32::from(self.message_code) << 4)
            | u32::from(self.update_number)
    }

    pub fn data_coding(&self) -> Result<CbsDataCoding, CodecError> {
        CbsDataCoding::decode(self.dcs)
    }
}

/// Decodes the text of one complete broadcast message. Every page must agree
/// on charset and ISO-639 framing. Returns the text and the language code:
/// either from the DCS language field or, with the ISO-639 prefix present,
/// from the first page's embedded two-letter code.
pub fn decode_cbs_text(pages: &[Cbs]) -> Result<(String, Option<String>), CodecError> {
    let first = pages.first().ok_or(CodecError::Incomplete)?;
    let coding = first.data_coding()?;

    let mut language = coding.language.and_then(|l| l.iso639().map(str::to_string));
    let mut out = String::new();

    for page in pages {
        let page_coding = page.data_coding()?;
        if page_coding.charset != coding.charset || page_coding.iso639 != coding.iso639 {
            return Err(CodecError::MixedBroadcastPages);
        }

        match coding.charset {
            Charset::Gsm7Bit => {
                // pages are padded to full length, USSD-style
                let mut septets = charset::unpack_7bit(&page.ud, 0, true, 0);

                if coding.iso639 {
                    if std::ptr::eq(page, first) && septets.len() >= 2 {
                        language = Some(charset::gsm_to_utf8(
                            &septets[..2],
                            GsmDialect::Default,
                            GsmDialect::Default,
                        ));
                    }
                    // two language septets plus a CR
                    septets.drain(..septets.len().min(3));
                }

                while septets.last() == Some(&b'\r') {
                    septets.pop();
                }

                out.push_str(&charset::gsm_to_utf8(
                    &septets,
                    GsmDialect::Default,
                    GsmDialect::Default,
                ));
            }
            Charset::Ucs2 => {
                let mut ud: &[u8] = &page.ud;

                if coding.iso639 {
                    if std::ptr::eq(page, first) && ud.len() >= 2 {
                        let prefix: String = ud[..2]
                            .iter()
                            .map(|&b| char::from(b.min(0x7F)))
                            .collect();
                        language = Some(prefix);
                    }
                    ud = &ud[2..];
                }

                let units: Vec<u16> = ud[..ud.len() & !1]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .take_while(|&u| u != u16::from(b'\r'))
                    .collect();

                out.extend(
                    char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
                );
            }
            Charset::EightBit => return Err(CodecError::InvalidDataCoding(page.dcs)),
        }
    }

    Ok((out, language))
}

#[derive(Debug)]
struct CbsNode {
    bitmap: u16,
    pages: Vec<Cbs>,
}

/// Reassembles multi-page broadcasts and suppresses stale repeats. An update
/// is accepted only when its update number is one to eight steps (mod 16)
/// ahead of the last completed update for the same message in that scope.
#[derive(Debug, Default)]
pub struct CbsAssembly {
    nodes: Vec<(u32, CbsNode)>,
    recv_plmn: Vec<u32>,
    recv_loc: Vec<u32>,
    recv_cell: Vec<u32>,
}

impl CbsAssembly {
    pub fn new() -> CbsAssembly {
        CbsAssembly::default()
    }

    /// Offers one page; returns the ordered page list once complete
    pub fn add_page(&mut self, page: &Cbs) -> Option<Vec<Cbs>> {
        let mut page = page.clone();
        if page.max_pages == 0 {
            page.max_pages = 1;
            page.page = 1;
        }

        let serial = page.serial();
        if !self.update_accepted(page.gs, serial) {
            return None;
        }

        if page.max_pages == 1 {
            self.record_completed(page.gs, serial);
            return Some(vec![page]);
        }

        if page.page == 0 || page.page > page.max_pages {
            return None;
        }

        let index = match self.nodes.iter().position(|(s, _)| *s == serial) {
            Some(index) => index,
            None => {
                self.nodes.push((
                    serial,
                    CbsNode {
                        bitmap: 0,
                        pages: Vec::new(),
                    },
                ));
                self.nodes.len() - 1
            }
        };

        let node = &mut self.nodes[index].1;
        let bit = 1u16 << page.page;
        if node.bitmap & bit != 0 {
            return None;
        }

        let position = (node.bitmap & (bit - 1)).count_ones() as usize;
        node.pages.insert(position, page.clone());
        node.bitmap |= bit;

        if node.pages.len() < page.max_pages as usize {
            return None;
        }

        let (_, node) = self.nodes.remove(index);
        self.record_completed(page.gs, serial);
        Some(node.pages)
    }

    /// Invalidates per-scope state when the serving cell moves. A PLMN
    /// change implies a LAC change implies a cell change.
    pub fn location_changed(&mut self, plmn: bool, lac: bool, ci: bool) {
        let (plmn, lac, ci) = if plmn {
            (true, true, true)
        } else if lac {
            (false, true, true)
        } else {
            (false, false, ci)
        };

        if plmn {
            self.recv_plmn.clear();
            self.drop_scope(&[GeoScope::Plmn]);
        }
        if lac {
            self.recv_loc.clear();
            self.drop_scope(&[GeoScope::ServiceArea]);
        }
        if ci {
            self.recv_cell.clear();
            self.drop_scope(&[GeoScope::CellImmediate, GeoScope::CellNormal]);
        }
    }

    fn recall_list(&mut self, gs: GeoScope) -> &mut Vec<u32> {
        match gs {
            GeoScope::Plmn => &mut self.recv_plmn,
            GeoScope::ServiceArea => &mut self.recv_loc,
            GeoScope::CellImmediate | GeoScope::CellNormal => &mut self.recv_cell,
        }
    }

    fn update_accepted(&mut self, gs: GeoScope, serial: u32) -> bool {
        let list = self.recall_list(gs);
        match list.iter().find(|&&s| s & !0xF == serial & !0xF) {
            Some(completed) => {
                let step = serial.wrapping_sub(*completed) & 0xF;
                (1..=8).contains(&step)
            }
            None => true,
        }
    }

    fn record_completed(&mut self, gs: GeoScope, serial: u32) {
        let list = self.recall_list(gs);
        list.retain(|&s| s & !0xF != serial & !0xF);
        list.push(serial);
    }

    fn drop_scope(&mut self, scopes: &[GeoScope]) {
        self.nodes.retain(|(serial, _)| {
            let gs = GeoScope::from_bits((serial >> 14) as u8);
            !scopes.contains(&gs)
        });
    }
}
