// GSM 7-bit default alphabet and national language shift tables (3GPP TS 23.038)
// Septet packing/unpacking and conversion between GSM septets and UTF-8

/// National language dialects selectable through UDH shift information elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GsmDialect {
    #[default]
    Default,
    Turkish,
    Spanish,
    Portuguese,
}

impl GsmDialect {
    /// Maps a national-language identifier from a shift IE. Unknown codes fall
    /// back to the default alphabet.
    pub fn from_variant(code: u8) -> GsmDialect {
        match code {
            1 => GsmDialect::Turkish,
            2 => GsmDialect::Spanish,
            3 => GsmDialect::Portuguese,
            _ => GsmDialect::Default,
        }
    }

    /// National-language identifier carried in shift IEs.
    pub fn variant_code(self) -> u8 {
        match self {
            GsmDialect::Default => 0,
            GsmDialect::Turkish => 1,
            GsmDialect::Spanish => 2,
            GsmDialect::Portuguese => 3,
        }
    }
}

/// GSM 7-bit default alphabet to Unicode.
static GSM_TABLE: [u16; 128] = [
    0x0040, 0x00A3, 0x0024, 0x00A5, 0x00E8, 0x00E9, 0x00F9, 0x00EC, // 0x07
    0x00F2, 0x00C7, 0x000A, 0x00D8, 0x00F8, 0x000D, 0x00C5, 0x00E5, // 0x0F
    0x0394, 0x005F, 0x03A6, 0x0393, 0x039B, 0x03A9, 0x03A0, 0x03A8, // 0x17
    0x03A3, 0x0398, 0x039E, 0x00A0, 0x00C6, 0x00E6, 0x00DF, 0x00C9, // 0x1F
    0x0020, 0x0021, 0x0022, 0x0023, 0x00A4, 0x0025, 0x0026, 0x0027, // 0x27
    0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F, // 0x2F
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, // 0x37
    0x0038, 0x0039, 0x003A, 0x003B, 0x003C, 0x003D, 0x003E, 0x003F, // 0x3F
    0x00A1, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047, // 0x47
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, // 0x4F
    0x0050, 0x0051, 0x0052, 0x0053, 0x0054, 0x0055, 0x0056, 0x0057, // 0x57
    0x0058, 0x0059, 0x005A, 0x00C4, 0x00D6, 0x00D1, 0x00DC, 0x00A7, // 0x5F
    0x00BF, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, // 0x67
    0x0068, 0x0069, 0x006A, 0x006B, 0x006C, 0x006D, 0x006E, 0x006F, // 0x6F
    0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077, // 0x77
    0x0078, 0x0079, 0x007A, 0x00E4, 0x00F6, 0x00F1, 0x00FC, 0x00E0, // 0x7F
];

/// Turkish national language locking shift table (TS 23.038 Annex A.3.1).
static TURKISH_TABLE: [u16; 128] = [
    0x0040, 0x00A3, 0x0024, 0x00A5, 0x20AC, 0x00E9, 0x00F9, 0x0131, // 0x07
    0x00F2, 0x00C7, 0x000A, 0x011E, 0x011F, 0x000D, 0x00C5, 0x00E5, // 0x0F
    0x0394, 0x005F, 0x03A6, 0x0393, 0x039B, 0x03A9, 0x03A0, 0x03A8, // 0x17
    0x03A3, 0x0398, 0x039E, 0x00A0, 0x015E, 0x015F, 0x00DF, 0x00C9, // 0x1F
    0x0020, 0x0021, 0x0022, 0x0023, 0x00A4, 0x0025, 0x0026, 0x0027, // 0x27
    0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F, // 0x2F
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, // 0x37
    0x0038, 0x0039, 0x003A, 0x003B, 0x003C, 0x003D, 0x003E, 0x003F, // 0x3F
    0x0130, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047, // 0x47
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, // 0x4F
    0x0050, 0x0051, 0x0052, 0x0053, 0x0054, 0x0055, 0x0056, 0x0057, // 0x57
    0x0058, 0x0059, 0x005A, 0x00C4, 0x00D6, 0x00D1, 0x00DC, 0x00A7, // 0x5F
    0x00E7, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, // 0x67
    0x0068, 0x0069, 0x006A, 0x006B, 0x006C, 0x006D, 0x006E, 0x006F, // 0x6F
    0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077, // 0x77
    0x0078, 0x0079, 0x007A, 0x00E4, 0x00F6, 0x00F1, 0x00FC, 0x00E0, // 0x7F
];

/// Portuguese national language locking shift table (TS 23.038 Annex A.3.3).
static PORTUGUESE_TABLE: [u16; 128] = [
    0x0040, 0x00A3, 0x0024, 0x00A5, 0x00EA, 0x00E9, 0x00FA, 0x00ED, // 0x07
    0x00F3, 0x00E7, 0x000A, 0x00D4, 0x00F4, 0x000D, 0x00C1, 0x00E1, // 0x0F
    0x0394, 0x005F, 0x00AA, 0x00C7, 0x00C0, 0x221E, 0x005E, 0x005C, // 0x17
    0x20AC, 0x00D3, 0x007C, 0x00A0, 0x00C2, 0x00E2, 0x00CA, 0x00C9, // 0x1F
    0x0020, 0x0021, 0x0022, 0x0023, 0x00BA, 0x0025, 0x0026, 0x0027, // 0x27
    0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F, // 0x2F
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, // 0x37
    0x0038, 0x0039, 0x003A, 0x003B, 0x003C, 0x003D, 0x003E, 0x003F, // 0x3F
    0x00CD, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047, // 0x47
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, // 0x4F
    0x0050, 0x0051, 0x0052, 0x0053, 0x0054, 0x0055, 0x0056, 0x0057, // 0x57
    0x0058, 0x0059, 0x005A, 0x00C3, 0x00D5, 0x00DA, 0x00DC, 0x00A7, // 0x5F
    0x007E, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, // 0x67
    0x0068, 0x0069, 0x006A, 0x006B, 0x006C, 0x006D, 0x006E, 0x006F, // 0x6F
    0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077, // 0x77
    0x0078, 0x0079, 0x007A, 0x00E3, 0x00F5, 0x0060, 0x00FC, 0x00E0, // 0x7F
];

/// GSM default alphabet extension table, for sequences starting with ESC (0x1B).
static DEFAULT_EXT: [(u8, u16); 11] = [
    (0x0A, 0x000C), // See NOTE 3 in 23.038
    (0x14, 0x005E),
    (0x1B, 0x0020), // See NOTE 1 in 23.038
    (0x28, 0x007B),
    (0x29, 0x007D),
    (0x2F, 0x005C),
    (0x3C, 0x005B),
    (0x3D, 0x007E),
    (0x3E, 0x005D),
    (0x40, 0x007C),
    (0x65, 0x20AC),
];

static TURKISH_EXT: [(u8, u16); 18] = [
    (0x0A, 0x000C),
    (0x14, 0x005E),
    (0x1B, 0x0020),
    (0x28, 0x007B),
    (0x29, 0x007D),
    (0x2F, 0x005C),
    (0x3C, 0x005B),
    (0x3D, 0x007E),
    (0x3E, 0x005D),
    (0x40, 0x007C),
    (0x47, 0x011E),
    (0x49, 0x0130),
    (0x53, 0x015E),
    (0x63, 0x00E7),
    (0x65, 0x20AC),
    (0x67, 0x011F),
    (0x69, 0x0131),
    (0x73, 0x015F),
];

static SPANISH_EXT: [(u8, u16); 20] = [
    (0x09, 0x00E7),
    (0x0A, 0x000C),
    (0x14, 0x005E),
    (0x1B, 0x0020),
    (0x28, 0x007B),
    (0x29, 0x007D),
    (0x2F, 0x005C),
    (0x3C, 0x005B),
    (0x3D, 0x007E),
    (0x3E, 0x005D),
    (0x40, 0x007C),
    (0x41, 0x00C1),
    (0x49, 0x00CD),
    (0x4F, 0x00D3),
    (0x55, 0x00DA),
    (0x61, 0x00E1),
    (0x65, 0x20AC),
    (0x69, 0x00ED),
    (0x6F, 0x00F3),
    (0x75, 0x00FA),
];

static PORTUGUESE_EXT: [(u8, u16); 38] = [
    (0x05, 0x00EA),
    (0x09, 0x00E7),
    (0x0A, 0x000C),
    (0x0B, 0x00D4),
    (0x0C, 0x00F4),
    (0x0E, 0x00C1),
    (0x0F, 0x00E1),
    (0x12, 0x03A6),
    (0x13, 0x0393),
    (0x14, 0x005E),
    (0x15, 0x03A9),
    (0x16, 0x03A0),
    (0x17, 0x03A8),
    (0x18, 0x03A3),
    (0x19, 0x0398),
    (0x1B, 0x0020),
    (0x1F, 0x00CA),
    (0x28, 0x007B),
    (0x29, 0x007D),
    (0x2F, 0x005C),
    (0x3C, 0x005B),
    (0x3D, 0x007E),
    (0x3E, 0x005D),
    (0x40, 0x007C),
    (0x41, 0x00C0),
    (0x49, 0x00CD),
    (0x4F, 0x00D3),
    (0x55, 0x00DA),
    (0x5B, 0x00C3),
    (0x5C, 0x00D5),
    (0x61, 0x00C2),
    (0x65, 0x20AC),
    (0x69, 0x00ED),
    (0x6F, 0x00F3),
    (0x75, 0x00FA),
    (0x7B, 0x00E3),
    (0x7C, 0x00F5),
    (0x7E, 0x00E2),
];

const ESC: u8 = 0x1B;

fn locking_table(dialect: GsmDialect) -> &'static [u16; 128] {
    match dialect {
        // Spanish defines no locking shift table of its own
        GsmDialect::Default | GsmDialect::Spanish => &GSM_TABLE,
        GsmDialect::Turkish => &TURKISH_TABLE,
        GsmDialect::Portuguese => &PORTUGUESE_TABLE,
    }
}

fn single_shift_table(dialect: GsmDialect) -> &'static [(u8, u16)] {
    match dialect {
        GsmDialect::Default => &DEFAULT_EXT,
        GsmDialect::Turkish => &TURKISH_EXT,
        GsmDialect::Spanish => &SPANISH_EXT,
        GsmDialect::Portuguese => &PORTUGUESE_EXT,
    }
}

fn ext_lookup(table: &[(u8, u16)], code: u8) -> Option<u16> {
    table
        .iter()
        .find(|&&(gsm, _)| gsm == code)
        .map(|&(_, uni)| uni)
}

fn ext_reverse_lookup(table: &[(u8, u16)], c: char) -> Option<u8> {
    let cp = u32::from(c);
    table
        .iter()
        // ESC ESC is a decode-side convention only, never emitted
        .find(|&&(gsm, uni)| gsm != ESC && u32::from(uni) == cp)
        .map(|&(gsm, _)| gsm)
}

/// Converts unpacked GSM septets to UTF-8 using the given locking and single
/// shift tables. A lone ESC, one whose successor has no single-shift mapping,
/// decodes as a space and the successor is decoded from the locking table.
pub fn gsm_to_utf8(septets: &[u8], locking: GsmDialect, single: GsmDialect) -> String {
    let table = locking_table(locking);
    let ext = single_shift_table(single);
    let mut out = String::with_capacity(septets.len());

    let mut i = 0;
    while i < septets.len() {
        let c = septets[i] & 0x7F;

        if c == ESC && i + 1 < septets.len() {
            if let Some(uni) = ext_lookup(ext, septets[i + 1] & 0x7F) {
                // All extension codepoints are in the BMP
                if let Some(ch) = char::from_u32(u32::from(uni)) {
                    out.push(ch);
                }
                i += 2;
                continue;
            }
        }

        if c == ESC {
            out.push(' ');
        } else if let Some(ch) = char::from_u32(u32::from(table[usize::from(c)])) {
            out.push(ch);
        }
        i += 1;
    }

    out
}

/// Converts UTF-8 text to unpacked GSM septets, or `None` when any character
/// has no mapping in the chosen tables.
pub fn utf8_to_gsm(text: &str, locking: GsmDialect, single: GsmDialect) -> Option<Vec<u8>> {
    let table = locking_table(locking);
    let ext = single_shift_table(single);
    let mut out = Vec::with_capacity(text.len());

    for c in text.chars() {
        let cp = u32::from(c);
        let locked = table
            .iter()
            .position(|&uni| u32::from(uni) == cp)
            .filter(|&idx| idx != usize::from(ESC));

        if let Some(idx) = locked {
            out.push(idx as u8);
        } else if let Some(code) = ext_reverse_lookup(ext, c) {
            out.push(ESC);
            out.push(code);
        } else {
            return None;
        }
    }

    Some(out)
}

/// Number of fill bits inserted after `byte_offset` header octets so the
/// first septet starts on a septet boundary.
fn fill_bits(byte_offset: usize) -> usize {
    (7 - (byte_offset % 7)) % 7
}

/// Packs septets into octets, low bits first, starting after `byte_offset`
/// header octets worth of fill. In USSD/CBS mode the trailing-CR padding
/// rules of TS 23.038 6.1.2.3.1 apply.
pub fn pack_7bit(septets: &[u8], byte_offset: usize, ussd: bool) -> Vec<u8> {
    let fill = fill_bits(byte_offset);
    let total_bits = septets.len() * 7 + fill;
    let mut out = vec![0u8; total_bits.div_ceil(8)];

    let mut bit = fill;
    for &s in septets {
        for k in 0..7 {
            if s & (1 << k) != 0 {
                out[(bit + k) / 8] |= 1 << ((bit + k) % 8);
            }
        }
        bit += 7;
    }

    // 7 spare bits at the end would read back as '@'; pad with <CR>
    if ussd && total_bits % 8 == 1 {
        if let Some(last) = out.last_mut() {
            *last |= b'\r' << 1;
        }
    }

    // A wanted final <CR> on an octet boundary is doubled
    if ussd && total_bits % 8 == 0 && septets.last() == Some(&b'\r') {
        out.push(b'\r');
    }

    out
}

/// Unpacks packed 7-bit data into septets. `byte_offset` gives the number of
/// header octets preceding `data` (fill bits are skipped accordingly). In
/// USSD/CBS mode as many septets as fit are taken and a final padding <CR> on
/// an octet boundary is removed; otherwise at most `max_septets` are taken.
pub fn unpack_7bit(data: &[u8], byte_offset: usize, ussd: bool, max_septets: usize) -> Vec<u8> {
    let fill = fill_bits(byte_offset);
    let total_bits = data.len() * 8;
    let max = if ussd { data.len() * 8 / 7 } else { max_septets };
    let mut out = Vec::with_capacity(max);

    let mut bit = fill;
    while out.len() < max && bit + 7 <= total_bits {
        let mut septet = 0u8;
        for k in 0..7 {
            let idx = bit + k;
            if data[idx / 8] & (1 << (idx % 8)) != 0 {
                septet |= 1 << k;
            }
        }
        out.push(septet);
        bit += 7;
    }

    if ussd && out.len() % 8 == 0 && out.last() == Some(&b'\r') {
        out.pop();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_no_offset() {
        let septets: Vec<u8> = "hellohello".bytes().collect();
        let packed = pack_7bit(&septets, 0, false);
        assert_eq!(
            packed,
            [0xE8, 0x32, 0x9B, 0xFD, 0x46, 0x97, 0xD9, 0xEC, 0x37]
        );

        let unpacked = unpack_7bit(&packed, 0, false, septets.len());
        assert_eq!(unpacked, septets);
    }

    #[test]
    fn pack_unpack_with_header_offset() {
        let septets: Vec<u8> = "with a concat header".bytes().collect();
        // 6 header octets leave one fill bit before the first septet
        let packed = pack_7bit(&septets, 6, false);
        let unpacked = unpack_7bit(&packed, 6, false, septets.len());
        assert_eq!(unpacked, septets);
    }

    #[test]
    fn utf8_gsm_roundtrip_default() {
        let text = "Hòtel @ £5 [ok]~";
        let septets = utf8_to_gsm(text, GsmDialect::Default, GsmDialect::Default).unwrap();
        let back = gsm_to_utf8(&septets, GsmDialect::Default, GsmDialect::Default);
        assert_eq!(back, text);
    }

    #[test]
    fn utf8_gsm_rejects_unmappable() {
        assert!(utf8_to_gsm("кириллица", GsmDialect::Default, GsmDialect::Default).is_none());
        // Turkish single shift covers the dotless i
        assert!(utf8_to_gsm("ı", GsmDialect::Default, GsmDialect::Default).is_none());
        assert!(utf8_to_gsm("ı", GsmDialect::Default, GsmDialect::Turkish).is_some());
    }

    #[test]
    fn lone_escape_decodes_as_space() {
        // 0x1C has no single-shift mapping in the default tables
        let out = gsm_to_utf8(&[0x1B, 0x1C], GsmDialect::Default, GsmDialect::Default);
        assert_eq!(out, " Æ");
    }

    #[test]
    fn euro_uses_single_shift() {
        let septets = utf8_to_gsm("€", GsmDialect::Default, GsmDialect::Default).unwrap();
        assert_eq!(septets, [0x1B, 0x65]);
    }

    #[test]
    fn ussd_cr_padding() {
        // 7 septets leave 7 spare bits; the pad <CR> must vanish on unpack
        let septets = b"abcdefg";
        let packed = pack_7bit(septets, 0, true);
        assert_eq!(packed.len(), 7);
        let unpacked = unpack_7bit(&packed, 0, true, 0);
        assert_eq!(unpacked, septets);
    }

    #[test]
    fn ussd_final_cr_doubled() {
        // A wanted final <CR> on an octet boundary is sent twice
        let septets = b"abcdefg\r";
        let packed = pack_7bit(septets, 0, true);
        assert_eq!(packed.len(), 8);
        assert_eq!(packed[7], b'\r');
    }
}
