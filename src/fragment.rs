// Splits outgoing text or datagrams into submit TPDUs
// Picks the cheapest alphabet, then sizes segments around the UDH

use crate::charset::{self, GsmDialect};
use crate::codec::{Sms, Tpdu, UserData};
use crate::datatypes::{Address, Submit, ValidityPeriod};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Text cannot be encoded: contains characters outside UCS-2")]
    UnencodableText,

    #[error("Payload needs {0} segments, limit is 255")]
    TooManyFragments(usize),
}

const RELATIVE_VALIDITY_24H: u8 = 0xA7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    /// GSM septets plus the locking/single-shift tables they assume
    Gsm(GsmDialect, GsmDialect),
    Ucs2,
    EightBit,
}

/// Splits `text` into one or more submit messages addressed to `to`,
/// trying the default alphabet, then the default with the national
/// single-shift table, then the national locking table, then UCS-2.
pub fn prepare_text(
    to: &str,
    text: &str,
    reference: u16,
    use_16bit_ref: bool,
    status_report: bool,
    dialect: GsmDialect,
) -> Result<Vec<Sms>, PrepareError> {
    let (payload, data) = match gsm_encode_best(text, dialect) {
        Some((locking, single, septets)) => (Payload::Gsm(locking, single), septets),
        None => {
            let mut ucs2 = Vec::with_capacity(text.len() * 2);
            for c in text.chars() {
                let cp = u32::from(c);
                if cp > 0xFFFF {
                    return Err(PrepareError::UnencodableText);
                }
                ucs2.extend_from_slice(&(cp as u16).to_be_bytes());
            }
            (Payload::Ucs2, ucs2)
        }
    };

    prepare(to, payload, &data, reference, use_16bit_ref, status_report, None)
}

/// Splits a raw 8-bit payload into submit messages carrying a 16-bit
/// application port pair in every segment.
pub fn prepare_datagram(
    to: &str,
    data: &[u8],
    dst_port: u16,
    src_port: u16,
    reference: u16,
    use_16bit_ref: bool,
    status_report: bool,
) -> Result<Vec<Sms>, PrepareError> {
    prepare(
        to,
        Payload::EightBit,
        data,
        reference,
        use_16bit_ref,
        status_report,
        Some((dst_port, src_port)),
    )
}

fn gsm_encode_best(
    text: &str,
    dialect: GsmDialect,
) -> Option<(GsmDialect, GsmDialect, Vec<u8>)> {
    let default = GsmDialect::Default;

    if let Some(septets) = charset::utf8_to_gsm(text, default, default) {
        return Some((default, default, septets));
    }

    if dialect != default {
        if let Some(septets) = charset::utf8_to_gsm(text, default, dialect) {
            return Some((default, dialect, septets));
        }
        if let Some(septets) = charset::utf8_to_gsm(text, dialect, dialect) {
            return Some((dialect, dialect, septets));
        }
    }

    None
}

fn prepare(
    to: &str,
    payload: Payload,
    data: &[u8],
    reference: u16,
    use_16bit_ref: bool,
    status_report: bool,
    ports: Option<(u16, u16)>,
) -> Result<Vec<Sms>, PrepareError> {
    let daddr = Address::from(to);

    let dcs = match payload {
        Payload::Gsm(..) => 0x00,
        Payload::Ucs2 => 0x08,
        Payload::EightBit => 0x04,
    };

    // IEs present in every segment, (iei, data)
    let mut fixed_ies: Vec<(u8, Vec<u8>)> = Vec::new();
    if let Payload::Gsm(locking, single) = payload {
        if locking != GsmDialect::Default {
            fixed_ies.push((0x25, vec![locking.variant_code()]));
        }
        if single != GsmDialect::Default {
            fixed_ies.push((0x24, vec![single.variant_code()]));
        }
    }
    if let Some((dst, src)) = ports {
        fixed_ies.push((
            0x05,
            vec![(dst >> 8) as u8, dst as u8, (src >> 8) as u8, src as u8],
        ));
    }

    let fixed_header = header_octets(&fixed_ies);
    if fits_single_segment(payload, data.len(), fixed_header) {
        return Ok(vec![build_submit(
            &daddr,
            payload,
            dcs,
            data,
            &fixed_ies,
            status_report,
        )]);
    }

    let concat_ie_len: usize = if use_16bit_ref { 4 } else { 3 };
    let header = header_octets_with(fixed_header, concat_ie_len);
    let segments = split(payload, data, header);

    if segments.len() > 255 {
        return Err(PrepareError::TooManyFragments(segments.len()));
    }

    let mut out = Vec::with_capacity(segments.len());
    let total = segments.len() as u8;

    for (i, seg) in segments.iter().enumerate() {
        let seq = (i + 1) as u8;
        let mut ies = Vec::with_capacity(fixed_ies.len() + 1);
        if use_16bit_ref {
            ies.push((0x08u8, vec![(reference >> 8) as u8, reference as u8, total, seq]));
        } else {
            ies.push((0x00u8, vec![reference as u8, total, seq]));
        }
        ies.extend(fixed_ies.iter().cloned());

        out.push(build_submit(&daddr, payload, dcs, seg, &ies, status_report));
    }

    Ok(out)
}

/// Header size in octets including the length octet; zero when empty
fn header_octets(ies: &[(u8, Vec<u8>)]) -> usize {
    if ies.is_empty() {
        0
    } else {
        1 + ies.iter().map(|(_, data)| 2 + data.len()).sum::<usize>()
    }
}

fn header_octets_with(fixed_header: usize, concat_ie_len: usize) -> usize {
    // already has a length octet unless the fixed set was empty
    let base = if fixed_header == 0 { 1 } else { fixed_header };
    base + 2 + concat_ie_len
}

fn fits_single_segment(payload: Payload, len: usize, header: usize) -> bool {
    match payload {
        Payload::Gsm(..) => len <= (140 - header) * 8 / 7,
        Payload::Ucs2 => len <= (140 - header) & !1,
        Payload::EightBit => len <= 140 - header,
    }
}

fn split(payload: Payload, data: &[u8], header: usize) -> Vec<&[u8]> {
    let seg_max = match payload {
        Payload::Gsm(..) => (140 - header) * 8 / 7,
        Payload::Ucs2 => (140 - header) & !1,
        Payload::EightBit => 140 - header,
    };

    let mut segments = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let mut take = rest.len().min(seg_max);
        // never split an escape sequence across segments
        if matches!(payload, Payload::Gsm(..)) && take < rest.len() && rest[take - 1] == 0x1B {
            take -= 1;
        }
        segments.push(&rest[..take]);
        rest = &rest[take..];
    }

    segments
}

fn build_submit(
    daddr: &Address,
    payload: Payload,
    dcs: u8,
    seg: &[u8],
    ies: &[(u8, Vec<u8>)],
    status_report: bool,
) -> Sms {
    let mut ud = Vec::with_capacity(140);

    if !ies.is_empty() {
        let udh_len: usize = ies.iter().map(|(_, data)| 2 + data.len()).sum();
        ud.push(udh_len as u8);
        for (iei, data) in ies {
            ud.push(*iei);
            ud.push(data.len() as u8);
            ud.extend_from_slice(data);
        }
    }

    let header = ud.len();
    let udl = match payload {
        Payload::Gsm(..) => {
            ud.extend_from_slice(&charset::pack_7bit(seg, header, false));
            (header * 8).div_ceil(7) + seg.len()
        }
        _ => {
            ud.extend_from_slice(seg);
            header + seg.len()
        }
    };

    Sms {
        sc_addr: Address::default(),
        tpdu: Tpdu::Submit(Submit {
            rd: false,
            srr: status_report,
            udhi: header > 0,
            rp: false,
            mr: 0,
            daddr: daddr.clone(),
            pid: 0,
            dcs,
            vp: ValidityPeriod::Relative(RELATIVE_VALIDITY_24H),
            ud: UserData {
                udl: udl as u8,
                data: ud,
            },
        }),
    }
}
