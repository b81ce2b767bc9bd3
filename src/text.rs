// Extracts text or datagram payloads from an ordered fragment list
// Fragments that fail to decode are skipped, not fatal

use crate::charset::{self, GsmDialect};
use crate::codec::Sms;
use crate::datatypes::{Charset, MwiDataCoding, SmsDataCoding};
use crate::udh::{UdhIterator, extract_language_variant};

/// Concatenates the text of already-ordered fragments. Fragments with a
/// reserved coding scheme or an 8-bit payload are skipped. Returns `None`
/// when nothing decodable remains.
pub fn decode_text(fragments: &[Sms]) -> Option<String> {
    let mut out = String::new();

    for sms in fragments {
        let view = sms.user_data();

        let charset = match MwiDataCoding::decode(view.dcs)
            .map(|mwi| mwi.charset)
            .or_else(|_| SmsDataCoding::decode(view.dcs).map(|dcs| dcs.charset))
        {
            Ok(charset) => charset,
            Err(_) => continue,
        };

        let taken = UdhIterator::new(&view)
            .map(|iter| iter.total_octets())
            .unwrap_or(0);

        match charset {
            Charset::Gsm7Bit => {
                let (locking, single) = extract_language_variant(sms);
                let locking = GsmDialect::from_variant(locking.unwrap_or(0));
                let single = GsmDialect::from_variant(single.unwrap_or(0));

                // septets spent on the header, rounded up
                let max_chars = (view.udl as usize).saturating_sub((taken * 8).div_ceil(7));
                let mut septets =
                    charset::unpack_7bit(&view.data[taken..], taken, false, max_chars);

                // a trailing lone escape renders as nothing
                if septets.last() == Some(&0x1B) {
                    septets.pop();
                }

                out.push_str(&charset::gsm_to_utf8(&septets, locking, single));
            }
            Charset::Ucs2 => {
                let tail = &view.data[taken..];
                let units: Vec<u16> = tail[..tail.len() & !1]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();

                out.extend(
                    char::decode_utf16(units)
                        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
                );
            }
            Charset::EightBit => continue,
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

/// Concatenates the raw payload octets of already-ordered fragments,
/// skipping each fragment's user data header.
pub fn decode_datagram(fragments: &[Sms]) -> Option<Vec<u8>> {
    let mut out = Vec::new();

    for sms in fragments {
        let view = sms.user_data();
        let taken = UdhIterator::new(&view)
            .map(|iter| iter.total_octets())
            .unwrap_or(0);

        out.extend_from_slice(&view.data[taken..]);
    }

    if out.is_empty() { None } else { Some(out) }
}
