//! Integration tests for TPDU encoding, decoding, reassembly and fragmentation

use crate::charset::{self, GsmDialect};
use crate::codec::{Sms, Tpdu, decode_hex, encode_hex};
use crate::datatypes::{
    Address, Charset, Deliver, NumberType, NumberingPlan, SmsDataCoding, StatusReport, Submit,
    ValidityPeriod,
};
use std::time::{Duration, SystemTime};

fn decode_pdu(hex: &str, outgoing: bool, tpdu_len: usize) -> Sms {
    let raw = decode_hex(hex).unwrap();
    Sms::decode(&raw, outgoing, tpdu_len).unwrap()
}

fn deliver(sms: &Sms) -> &Deliver {
    match &sms.tpdu {
        Tpdu::Deliver(t) => t,
        other => panic!("expected deliver, got {other:?}"),
    }
}

fn submit(sms: &Sms) -> &Submit {
    match &sms.tpdu {
        Tpdu::Submit(t) => t,
        other => panic!("expected submit, got {other:?}"),
    }
}

fn status_report(sms: &Sms) -> &StatusReport {
    match &sms.tpdu {
        Tpdu::StatusReport(t) => t,
        other => panic!("expected status report, got {other:?}"),
    }
}

#[cfg(test)]
mod tpdu_tests {
    use super::*;
    use crate::text::decode_text;

    const SIMPLE_DELIVER: &str = "07911326040000F0040B911346610089F60000208062917314480CC8\
                                  F71D14969741F977FD07";

    const ALNUM_SENDER: &str = "0791447758100650040DD0F334FC1CA6970100008080312170224008D4\
                                F29CDE0EA7D9";

    const SIMPLE_SUBMIT: &str = "0011000B916407281553F80000AA0AE8329BFD4697D9EC37";

    #[test]
    fn test_simple_deliver() {
        let sms = decode_pdu(SIMPLE_DELIVER, false, 30);

        assert_eq!(sms.sc_addr.number_type, NumberType::International);
        assert_eq!(sms.sc_addr.numbering_plan, NumberingPlan::Isdn);
        assert_eq!(sms.sc_addr.address, "31624000000");

        let deliver = deliver(&sms);
        assert_eq!(deliver.oaddr.number_type, NumberType::International);
        assert_eq!(deliver.oaddr.numbering_plan, NumberingPlan::Isdn);
        assert_eq!(deliver.oaddr.address, "31641600986");

        assert_eq!(deliver.pid, 0);
        assert_eq!(deliver.dcs, 0);

        assert_eq!(deliver.scts.year, 2);
        assert_eq!(deliver.scts.month, 8);
        assert_eq!(deliver.scts.day, 26);
        assert_eq!(deliver.scts.hour, 19);
        assert_eq!(deliver.scts.minute, 37);
        assert_eq!(deliver.scts.second, 41);
        assert_eq!(deliver.scts.timezone, -4);

        assert_eq!(deliver.ud.udl, 12);
        assert_eq!(
            decode_text(std::slice::from_ref(&sms)).unwrap(),
            "How are you?"
        );

        let (pdu, tpdu_len) = sms.encode().unwrap();
        assert_eq!(tpdu_len, 30);
        assert_eq!(encode_hex(&pdu), SIMPLE_DELIVER);
    }

    #[test]
    fn test_alnum_sender() {
        let sms = decode_pdu(ALNUM_SENDER, false, 27);

        assert_eq!(sms.sc_addr.address, "447785016005");

        let deliver = deliver(&sms);
        assert_eq!(deliver.oaddr.number_type, NumberType::Alphanumeric);
        assert_eq!(deliver.oaddr.address, "sipgate");

        assert_eq!(deliver.scts.year, 8);
        assert_eq!(deliver.scts.month, 8);
        assert_eq!(deliver.scts.day, 13);
        assert_eq!(deliver.scts.hour, 12);
        assert_eq!(deliver.scts.minute, 7);
        assert_eq!(deliver.scts.second, 22);
        assert_eq!(deliver.scts.timezone, 4);

        assert_eq!(deliver.ud.udl, 8);
        assert_eq!(
            decode_text(std::slice::from_ref(&sms)).unwrap(),
            "Testmail"
        );

        let (pdu, tpdu_len) = sms.encode().unwrap();
        assert_eq!(tpdu_len, 27);
        assert_eq!(encode_hex(&pdu), ALNUM_SENDER);
    }

    #[test]
    fn test_simple_submit() {
        let sms = decode_pdu(SIMPLE_SUBMIT, true, 23);

        assert!(sms.sc_addr.address.is_empty());

        let submit = submit(&sms);
        assert_eq!(submit.mr, 0);
        assert_eq!(submit.daddr.number_type, NumberType::International);
        assert_eq!(submit.daddr.address, "46708251358");
        assert_eq!(submit.vp, ValidityPeriod::Relative(0xAA));

        assert_eq!(submit.ud.udl, 10);
        assert_eq!(
            decode_text(std::slice::from_ref(&sms)).unwrap(),
            "hellohello"
        );

        let (pdu, tpdu_len) = sms.encode().unwrap();
        assert_eq!(tpdu_len, 23);
        assert_eq!(encode_hex(&pdu), SIMPLE_SUBMIT);
    }
}

#[cfg(test)]
mod charset_tests {
    use super::*;

    /// All 128 codepoints of a 7-bit alphabet packed into one deliver PDU
    const ALPHABET_PDU: &str = concat!(
        "0001000B91", "5310101010", "1000008080", "8060402818", "0E888462C1",
        "68381E9088", "6442A9582E", "988C06C4E9", "783EA09068", "442A994EA8",
        "946AC56AB9", "5EB0986C46", "ABD96EB89C", "6EC7EBF97E", "C0A070482C",
        "1A8FC8A472", "C96C3A9FD0", "A8744AAD5A", "AFD8AC76CB", "ED7ABFE0B0",
        "784C2E9BCF", "E8B47ACD6E", "BBDFF0B87C", "4EAFDBEFF8", "BC7ECFEFFB",
        "FF"
    );

    const DEFAULT_EXT_PDU: &str = concat!(
        "0001000B91", "5310101010", "100000151B", "C58602DAA0", "36A9CD6BC3",
        "DBF436BE0D", "705306"
    );

    const TURKEY_EXT_PDU: &str = concat!(
        "0001000B91", "5310101010", "1000001A1B", "C586B2416D", "529BD786B7",
        "E96D7C1BE0", "02C8011318", "870E"
    );

    const PORTUGAL_EXT_PDU: &str = concat!(
        "0001000B91", "5310101010", "1000003184", "C446B16038", "1E1BC96662",
        "D9543696CD", "6583D9643C", "1BD42675D9", "F0C01B9F86", "02CC74B75C",
        "0EE68030EC", "F91D"
    );

    const SPAIN_PDU: &str = concat!(
        "0001000B91", "5310101010", "100000269B", "C446B1A16C", "509BD4E6B5",
        "E16D7A1BDF", "06B8096E92", "9BE7A6BA09", "6FCA9BF4E6", "BDA903"
    );

    fn check_charset(
        pdu: &str,
        data_len: usize,
        locking: GsmDialect,
        single: GsmDialect,
        expected: &str,
    ) {
        let raw = decode_hex(pdu).unwrap();
        let sms = Sms::decode(&raw, false, raw.len()).unwrap();

        let deliver = deliver(&sms);
        let coding = SmsDataCoding::decode(deliver.dcs).unwrap();
        assert_eq!(coding.charset, Charset::Gsm7Bit);
        assert!(!coding.compressed);

        let view = sms.user_data();
        assert_eq!(view.data.len(), data_len);

        let septets = charset::unpack_7bit(view.data, 0, false, usize::from(view.udl));
        assert_eq!(charset::gsm_to_utf8(&septets, locking, single), expected);
    }

    #[test]
    fn test_charset_default() {
        check_charset(
            ALPHABET_PDU,
            112,
            GsmDialect::Default,
            GsmDialect::Default,
            "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞ ÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
             ¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà",
        );
    }

    #[test]
    fn test_charset_default_ext() {
        check_charset(
            DEFAULT_EXT_PDU,
            19,
            GsmDialect::Default,
            GsmDialect::Default,
            "\u{c}^ {}\\[~]|€",
        );
    }

    #[test]
    fn test_charset_turkey() {
        check_charset(
            ALPHABET_PDU,
            112,
            GsmDialect::Turkish,
            GsmDialect::Default,
            "@£$¥€éùıòÇ\nĞğ\rÅåΔ_ΦΓΛΩΠΨΣΘΞ ŞşßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
             İABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§çabcdefghijklmnopqrstuvwxyzäöñüà",
        );
    }

    #[test]
    fn test_charset_turkey_ext() {
        check_charset(
            TURKEY_EXT_PDU,
            23,
            GsmDialect::Turkish,
            GsmDialect::Turkish,
            "\u{c}^{}\\[~]|ĞİŞç€ğış",
        );
    }

    #[test]
    fn test_charset_portugal() {
        check_charset(
            ALPHABET_PDU,
            112,
            GsmDialect::Portuguese,
            GsmDialect::Default,
            "@£$¥êéúíóç\nÔô\rÁáΔ_ªÇÀ∞^\\€Ó| ÂâÊÉ !\"#º%&'()*+,-./0123456789:;<=>?\
             ÍABCDEFGHIJKLMNOPQRSTUVWXYZÃÕÚÜ§~abcdefghijklmnopqrstuvwxyzãõ`üà",
        );
    }

    #[test]
    fn test_charset_portugal_ext() {
        check_charset(
            PORTUGAL_EXT_PDU,
            43,
            GsmDialect::Portuguese,
            GsmDialect::Portuguese,
            "êç\u{c}ÔôÁáΦΓ^ΩΠΨΣΘÊ{}\\[~]|ÀÍÓÚÃÕÂ€íóúãõâ",
        );
    }

    #[test]
    fn test_charset_spain() {
        check_charset(
            SPAIN_PDU,
            34,
            GsmDialect::Default,
            GsmDialect::Spanish,
            "ç\u{c}^{}\\[~]|ÁÍÓÚá€íóú",
        );
    }
}

#[cfg(test)]
mod udh_tests {
    use super::*;
    use crate::text::{decode_datagram, decode_text};
    use crate::udh::{Iei, UdhIterator, extract_app_port};

    const EMS_PDU_1: &str = concat!(
        "0041000B915121551532F40000631A0A031906200A032104100A03270504",
        "0A032E05080A043807002B8ACD29A85D9ECFC3E7F21C340EBB41E3B79B1",
        "E4EBB41697A989D1EB340E2379BCC02B1C3F27399059AB7C36C3628EC26",
        "83C66FF65B5E2683E8653C1D"
    );

    const EMS_PDU_2: &str = concat!(
        "079194712272303351030B915121340195F60000FF80230A030F07230A031",
        "806130A031E0A430A032E0D830A033D14020A035104F60A0355010600159",
        "D9E83D2735018442FCFE98A243DCC4E97C92C90F8CD26B3407537B92C67A",
        "7DD65320B1476934173BA3CBD2ED3D1F277FD8C76299CEF3B280C92A7CF6",
        "83A28CC4E9FDD6532E8FE96935D"
    );

    const WAP_PUSH_PDU: &str = concat!(
        "0791947122725014440185F039F501801140311480720605040B8423F00106",
        "246170706C69636174696F6E2F766E642E7761702E6D6D732D6D657373616",
        "76500AF84B4868C82984F67514B4B42008D9089088045726F74696B009650",
        "696E2D557073008A808E0240008805810303F48083687474703A2F2F65707",
        "3332E64652F4F2F5A39495A4F00"
    );

    fn check_ems(
        pdu: &str,
        tpdu_len: usize,
        udl: u8,
        udhl: u8,
        ie_lens: &[usize],
        expected: &str,
    ) {
        let sms = decode_pdu(pdu, true, tpdu_len);
        submit(&sms);

        let view = sms.user_data();
        assert_eq!(view.udl, udl);
        assert_eq!(view.data[0], udhl);

        let iter = UdhIterator::new(&view).unwrap();
        let lens: Vec<usize> = iter
            .map(|ie| {
                assert_eq!(ie.iei, Iei::TextFormatting);
                ie.data.len()
            })
            .collect();
        assert_eq!(lens, ie_lens);

        assert_eq!(decode_text(std::slice::from_ref(&sms)).unwrap(), expected);
    }

    #[test]
    fn test_ems_udh_1() {
        check_ems(
            EMS_PDU_1,
            100,
            99,
            26,
            &[3, 3, 3, 3, 4],
            "EMS messages can contain italic, bold, large, small and colored text",
        );
    }

    #[test]
    fn test_ems_udh_2() {
        check_ems(
            EMS_PDU_2,
            126,
            128,
            35,
            &[3, 3, 3, 3, 3, 3, 3],
            "This is a test\nItalied, bold, underlined, and strikethrough.\n\
             Now a right aligned word.",
        );
    }

    #[test]
    fn test_wap_push() {
        let sms = decode_pdu(WAP_PUSH_PDU, false, 128);

        let deliver = deliver(&sms);
        let coding = SmsDataCoding::decode(deliver.dcs).unwrap();
        assert_eq!(coding.charset, Charset::EightBit);

        let port = extract_app_port(&sms).unwrap();
        assert!(!port.is_8bit);
        assert_eq!(port.dst, 2948);

        let datagram = decode_datagram(std::slice::from_ref(&sms)).unwrap();
        assert!(!datagram.is_empty());
    }
}

#[cfg(test)]
mod assembly_tests {
    use super::*;
    use crate::assembly::SmsAssembly;
    use crate::fragment::{PrepareError, prepare_text};
    use crate::text::decode_text;
    use crate::udh::{extract_concatenation, extract_language_variant};

    pub(super) const ASSEMBLY_PDU_1: &str = concat!(
        "038121F340048155550119906041001222048C0500",
        "031E0301041804420430043A002C002004100",
        "43B0435043A04410430043D04340440002000",
        "200441043B044304480430043B00200437043",
        "000200434043204350440044C044E00200020",
        "04380020002004320441043500200431043E0",
        "43B044C044804350020043F04400435043804",
        "41043F043E043B043D044F043B0441044F002",
        "000200433043D0435"
    );

    pub(super) const ASSEMBLY_PDU_2: &str = concat!(
        "038121F340048155550119906041001222048C0500",
        "031E03020432043E043C002E000A041D04300",
        "43A043E043D04350446002C0020043D043500",
        "200432002004410438043B043004450020043",
        "40430043B043504350020044204350440043F",
        "04350442044C002C0020043E043D002004410",
        "44204400435043C043804420435043B044C04",
        "3D043E002004320431043504360430043B002",
        "004320020043A043E"
    );

    pub(super) const ASSEMBLY_PDU_3: &str = concat!(
        "038121F340048155550119906041001222044A0500",
        "031E0303043C043D043004420443002C00200",
        "43F043E043704300431044B0432000A043404",
        "3004360435002C002004470442043E0020002",
        "00431044B043B0020043D04300433002E"
    );

    #[test]
    fn test_assembly() {
        let sms1 = decode_pdu(ASSEMBLY_PDU_1, false, 155);
        let sms2 = decode_pdu(ASSEMBLY_PDU_2, false, 155);
        let sms3 = decode_pdu(ASSEMBLY_PDU_3, false, 89);

        let concat = extract_concatenation(&sms1).unwrap();
        assert_eq!(concat.max_fragments, 3);
        assert_eq!(concat.sequence, 1);

        let oaddr = deliver(&sms1).oaddr.clone();
        let now = SystemTime::now();
        let mut assembly = SmsAssembly::new(None);

        let r = assembly.add_fragment(&sms1, now, &oaddr, concat.reference, 3, 1);
        assert!(r.is_none());
        assert_eq!(assembly.len(), 1);

        assembly.expire(now + Duration::from_secs(40));
        assert!(assembly.is_empty());

        let r = assembly.add_fragment(&sms1, now, &oaddr, concat.reference, 3, 1);
        assert!(r.is_none());
        assert_eq!(assembly.len(), 1);

        let r = assembly.add_fragment(&sms2, now, &oaddr, concat.reference, 3, 2);
        assert!(r.is_none());

        let fragments = assembly
            .add_fragment(&sms3, now, &oaddr, concat.reference, 3, 3)
            .unwrap();
        assert_eq!(fragments.len(), 3);

        let text = decode_text(&fragments).unwrap();

        let prepared = prepare_text(
            "555",
            &text,
            concat.reference,
            true,
            false,
            GsmDialect::Default,
        )
        .unwrap();
        assert_eq!(prepared.len(), 3);
        assert_eq!(decode_text(&prepared).unwrap(), text);
    }

    #[test]
    fn test_prepare_7bit() {
        let mut r = prepare_text(
            "555",
            "This is testing !",
            0,
            false,
            false,
            GsmDialect::Default,
        )
        .unwrap();
        assert_eq!(r.len(), 1);

        let sms = &mut r[0];
        sms.sc_addr = Address::from("+358405202090");
        assert_eq!(sms.sc_addr.to_string(), "+358405202090");

        match &mut sms.tpdu {
            Tpdu::Submit(submit) => submit.daddr = Address::from("+358478400241"),
            other => panic!("expected submit, got {other:?}"),
        }

        let (pdu, tpdu_len) = sms.encode().unwrap();
        assert_eq!(tpdu_len, 29);
        assert_eq!(
            encode_hex(&pdu),
            "079153485002020911000C915348870420140000A71154747A0E4ACF41F4F29C9E769F4121"
        );
    }

    /// The last segment here ends with pad bits; udl has to disambiguate
    #[test]
    fn test_prepare_concat() {
        let text = "Shakespeare divided his time between London and Stratford during his \
                    career. In 1596, the year before he bought New Place as his family home \
                    in Stratford, Shakespeare was living in the parish of St. Helen's, \
                    Bishopsgate, north of the River Thames.";

        let prepared =
            prepare_text("+15554449999", text, 0, true, false, GsmDialect::Default).unwrap();
        assert_eq!(prepared.len(), 2);

        let mut assembly = SmsAssembly::new(None);
        let now = SystemTime::now();
        let mut complete = None;

        for sms in &prepared {
            let (pdu, tpdu_len) = sms.encode().unwrap();
            assert_eq!(pdu.len(), tpdu_len + 1);

            let decoded = Sms::decode(&pdu, true, pdu.len() - 1).unwrap();
            let concat = extract_concatenation(&decoded).unwrap();
            let daddr = submit(&decoded).daddr.clone();

            complete = assembly.add_fragment(
                &decoded,
                now,
                &daddr,
                concat.reference,
                concat.max_fragments,
                concat.sequence,
            );
        }

        let fragments = complete.unwrap();
        assert_eq!(decode_text(&fragments).unwrap(), text);
    }

    #[test]
    fn test_assembly_max_mismatch() {
        let sms1 = decode_pdu(ASSEMBLY_PDU_1, false, 155);
        let sms2 = decode_pdu(ASSEMBLY_PDU_2, false, 155);
        let sms3 = decode_pdu(ASSEMBLY_PDU_3, false, 89);

        let reference = extract_concatenation(&sms1).unwrap().reference;
        let oaddr = deliver(&sms1).oaddr.clone();
        let now = SystemTime::now();
        let mut assembly = SmsAssembly::new(None);

        let r = assembly.add_fragment(&sms1, now, &oaddr, reference, 3, 1);
        assert!(r.is_none());

        // disagrees with the node's declared count, dropped without a trace
        let r = assembly.add_fragment(&sms2, now, &oaddr, reference, 7, 2);
        assert!(r.is_none());
        assert_eq!(assembly.len(), 1);

        let r = assembly.add_fragment(&sms2, now, &oaddr, reference, 3, 2);
        assert!(r.is_none());

        let fragments = assembly
            .add_fragment(&sms3, now, &oaddr, reference, 3, 3)
            .unwrap();
        assert_eq!(fragments.len(), 3);
        assert!(decode_text(&fragments).is_some());
    }

    #[test]
    fn test_national_shift_per_fragment() {
        let turkish = "Ğİş ".repeat(40);

        let prepared = prepare_text("555", &turkish, 3, false, false, GsmDialect::Turkish).unwrap();
        assert_eq!(prepared.len(), 2);

        // every segment declares the single-shift table its text was packed with
        for sms in &prepared {
            let (locking, single) = extract_language_variant(sms);
            assert_eq!(locking, None);
            assert_eq!(single, Some(1));
        }
        assert_eq!(decode_text(&prepared).unwrap(), turkish);

        // a following default-alphabet fragment decodes under its own tables
        let plain = prepare_text("555", ", done", 0, false, false, GsmDialect::Default).unwrap();
        assert_eq!(extract_language_variant(&plain[0]), (None, None));

        let mut fragments = prepared;
        fragments.extend(plain);
        assert_eq!(
            decode_text(&fragments).unwrap(),
            format!("{turkish}, done")
        );
    }

    #[test]
    fn test_assembly_out_of_order() {
        let text: String = "All work and no play makes Jack a dull boy. ".repeat(16);

        let prepared =
            prepare_text("+15554449999", &text, 7, false, false, GsmDialect::Default).unwrap();
        assert_eq!(prepared.len(), 5);

        let mut assembly = SmsAssembly::new(None);
        let now = SystemTime::now();
        let mut complete = None;

        for i in [3usize, 1, 5, 2, 4] {
            assert!(complete.is_none());

            let sms = &prepared[i - 1];
            let concat = extract_concatenation(sms).unwrap();
            assert_eq!(concat.sequence, i as u8);
            let daddr = submit(sms).daddr.clone();

            complete = assembly.add_fragment(
                sms,
                now,
                &daddr,
                concat.reference,
                concat.max_fragments,
                concat.sequence,
            );
        }

        let fragments = complete.unwrap();
        assert_eq!(decode_text(&fragments).unwrap(), text);
    }

    fn check_limit(c: char, target_size: usize, use_16bit: bool) {
        let text: String = c.to_string().repeat(target_size);

        let prepared =
            prepare_text("555", &text, 0, use_16bit, false, GsmDialect::Default).unwrap();
        assert_eq!(prepared.len(), 255);

        let decoded = decode_text(&prepared).unwrap();
        assert_eq!(decoded.chars().count(), target_size);

        let over = format!("{text}{c}");
        assert_eq!(
            prepare_text("555", &over, 0, use_16bit, false, GsmDialect::Default),
            Err(PrepareError::TooManyFragments(256))
        );
    }

    #[test]
    fn test_prepare_limits() {
        // 152 GSM septets per segment with a 16-bit reference, 153 with 8-bit
        check_limit('A', 255 * 152, true);
        check_limit('A', 255 * 153, false);

        // 66 UCS-2 characters per segment with a 16-bit reference, 67 with 8-bit
        check_limit('Ж', 255 * 66, true);
        check_limit('Ж', 255 * 67, false);
    }
}

#[cfg(test)]
mod cbs_tests {
    use super::*;
    use crate::cbs::{Cbs, CbsAssembly, GeoScope, decode_cbs_text};

    const CBS_PDU_1: &str = concat!(
        "011000320111C2327BFC76BBCBEE46A3D168341A8D46A3D1683",
        "41A8D46A3D168341A8D46A3D168341A8D46A3D168341A8D46A3D168341A8D46A3D168",
        "341A8D46A3D168341A8D46A3D168341A8D46A3D168341A8D46A3D100"
    );

    const CBS_PDU_2: &str = concat!(
        "0110003201114679785E96371A8D46A3D168341A8D46A3D1683",
        "41A8D46A3D168341A8D46A3D168341A8D46A3D168341A8D46A3D168341A8D46A3D168",
        "341A8D46A3D168341A8D46A3D168341A8D46A3D168341A8D46A3D100"
    );

    #[test]
    fn test_cbs_encode_decode() {
        let raw = decode_hex(CBS_PDU_1).unwrap();
        assert_eq!(raw.len(), 88);

        let cbs = Cbs::decode(&raw).unwrap();
        assert_eq!(cbs.gs, GeoScope::CellImmediate);
        assert_eq!(cbs.message_code, 17);
        assert_eq!(cbs.update_number, 0);
        assert_eq!(cbs.message_identifier, 50);
        assert_eq!(cbs.dcs, 1);
        assert_eq!(cbs.max_pages, 1);
        assert_eq!(cbs.page, 1);

        let (text, lang) = decode_cbs_text(std::slice::from_ref(&cbs)).unwrap();
        assert_eq!(text, "Belconnen");
        assert_eq!(lang.as_deref(), Some("en"));

        assert_eq!(encode_hex(&cbs.encode()), CBS_PDU_1);
    }

    #[test]
    fn test_cbs_assembly() {
        let mut dec1 = Cbs::decode(&decode_hex(CBS_PDU_1).unwrap()).unwrap();
        let mut dec2 = Cbs::decode(&decode_hex(CBS_PDU_2).unwrap()).unwrap();

        let mut assembly = CbsAssembly::new();

        // single page completes immediately
        assert!(assembly.add_page(&dec1).is_some());

        // newer update of the same message is accepted
        dec1.update_number = 8;
        assert!(assembly.add_page(&dec1).is_some());

        // resends and older updates are ignored
        assert!(assembly.add_page(&dec1).is_none());
        dec1.update_number = 5;
        assert!(assembly.add_page(&dec1).is_none());

        assembly.location_changed(true, true, true);

        dec1.update_number = 9;
        dec1.page = 3;
        dec1.max_pages = 3;
        dec2.update_number = 9;
        dec2.page = 2;
        dec2.max_pages = 3;

        assert!(assembly.add_page(&dec2).is_none());
        assert!(assembly.add_page(&dec1).is_none());

        dec1.page = 1;
        let pages = assembly.add_page(&dec1).unwrap();

        let (text, _) = decode_cbs_text(&pages).unwrap();
        assert_eq!(text, "BelconnenFraserBelconnen");
    }
}

#[cfg(test)]
mod status_report_tests {
    use super::*;
    use crate::datatypes::DeliveryStatus;
    use crate::reports::{MessageId, StatusReportAssembly};

    pub(super) const SR_PDU_1: &str = "06040D91945152991136F00160124130340A0160124130940A00";
    pub(super) const SR_PDU_2: &str = "06050D91945152991136F00160124130640A0160124130450A00";
    const SR_PDU_3: &str = "0606098121436587F9019012413064A0019012413045A000";

    pub(super) fn message_id() -> MessageId {
        MessageId(std::array::from_fn(|i| i as u8))
    }

    fn set_status(sms: &mut Sms, st: u8) {
        match &mut sms.tpdu {
            Tpdu::StatusReport(t) => t.st = DeliveryStatus(st),
            other => panic!("expected status report, got {other:?}"),
        }
    }

    #[test]
    fn test_sr_assembly() {
        let sr1 = decode_pdu(SR_PDU_1, false, 26);
        let sr2 = decode_pdu(SR_PDU_2, false, 26);
        let sr3 = decode_pdu(SR_PDU_3, false, 24);

        assert_eq!(status_report(&sr1).mr, 4);
        assert_eq!(status_report(&sr2).mr, 5);
        assert_eq!(status_report(&sr3).mr, 6);

        let msgid = message_id();
        let now = SystemTime::now();
        let mut sra = StatusReportAssembly::new(None);

        // international address, mr 4 and mr 5
        let addr = Address::from("+4915259911630");
        sra.add_fragment(&msgid, &addr, 4, now, 2);
        sra.add_fragment(&msgid, &addr, 5, now, 2);

        sra.expire(now + Duration::from_secs(40));
        assert!(sra.is_empty());

        sra.add_fragment(&msgid, &addr, 4, now, 2);
        sra.add_fragment(&msgid, &addr, 5, now, 2);

        assert!(sra.report(status_report(&sr1)).is_none());
        let (id, delivered) = sra.report(status_report(&sr2)).unwrap();
        assert_eq!(id, msgid);
        assert!(delivered);

        // sent in national format, reported back in international format
        let addr = Address::from("9911630");
        sra.add_fragment(&msgid, &addr, 4, now, 2);
        sra.add_fragment(&msgid, &addr, 5, now, 2);

        assert!(sra.report(status_report(&sr1)).is_none());
        let (id, delivered) = sra.report(status_report(&sr2)).unwrap();
        assert_eq!(id, msgid);
        assert!(delivered);
        assert!(sra.is_empty());

        // sent in international format, reported back in national format
        let addr = Address::from("+358123456789");
        sra.add_fragment(&msgid, &addr, 6, now, 1);

        let (id, delivered) = sra.report(status_report(&sr3)).unwrap();
        assert_eq!(id, msgid);
        assert!(delivered);
        assert!(sra.is_empty());
    }

    #[test]
    fn test_sr_mixed_outcome() {
        let mut sr1 = decode_pdu(SR_PDU_1, false, 26);
        let sr2 = decode_pdu(SR_PDU_2, false, 26);

        let msgid = message_id();
        let now = SystemTime::now();
        let mut sra = StatusReportAssembly::new(None);

        let addr = Address::from("+4915259911630");
        sra.add_fragment(&msgid, &addr, 4, now, 2);
        sra.add_fragment(&msgid, &addr, 5, now, 2);

        // still trying; the reference stays outstanding
        set_status(&mut sr1, 0x20);
        assert!(sra.report(status_report(&sr1)).is_none());
        assert!(!sra.is_empty());

        // permanent failure resolves the reference
        set_status(&mut sr1, 0x45);
        assert!(sra.report(status_report(&sr1)).is_none());

        let (id, delivered) = sra.report(status_report(&sr2)).unwrap();
        assert_eq!(id, msgid);
        assert!(!delivered);
        assert!(sra.is_empty());
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::assembly_tests::{ASSEMBLY_PDU_1, ASSEMBLY_PDU_2, ASSEMBLY_PDU_3};
    use super::status_report_tests::{SR_PDU_1, SR_PDU_2, message_id};
    use super::*;
    use crate::assembly::SmsAssembly;
    use crate::reports::StatusReportAssembly;
    use crate::text::decode_text;
    use crate::udh::extract_concatenation;

    #[test]
    fn test_assembly_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("sms");

        let sms1 = decode_pdu(ASSEMBLY_PDU_1, false, 155);
        let sms2 = decode_pdu(ASSEMBLY_PDU_2, false, 155);
        let sms3 = decode_pdu(ASSEMBLY_PDU_3, false, 89);

        let concat = extract_concatenation(&sms1).unwrap();
        let oaddr = deliver(&sms1).oaddr.clone();
        let now = SystemTime::now();

        {
            let mut assembly = SmsAssembly::new(Some(dir.clone()));
            let r = assembly.add_fragment(&sms1, now, &oaddr, concat.reference, 3, 1);
            assert!(r.is_none());
            let r = assembly.add_fragment(&sms3, now, &oaddr, concat.reference, 3, 3);
            assert!(r.is_none());
        }

        let mut assembly = SmsAssembly::new(Some(dir.clone()));
        assert_eq!(assembly.len(), 1);

        let fragments = assembly
            .add_fragment(&sms2, now, &oaddr, concat.reference, 3, 2)
            .unwrap();
        assert_eq!(fragments.len(), 3);
        assert!(decode_text(&fragments).is_some());

        // the node directory is cleaned up on completion
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_sr_assembly_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("sr");

        let sr1 = decode_pdu(SR_PDU_1, false, 26);
        let sr2 = decode_pdu(SR_PDU_2, false, 26);

        let msgid = message_id();
        let addr = Address::from("+4915259911630");
        let expiration = SystemTime::now() + Duration::from_secs(3600);

        {
            let mut sra = StatusReportAssembly::new(Some(dir.clone()));
            sra.add_fragment(&msgid, &addr, 4, expiration, 2);
            sra.add_fragment(&msgid, &addr, 5, expiration, 2);
        }

        let mut sra = StatusReportAssembly::new(Some(dir.clone()));
        assert!(!sra.is_empty());

        assert!(sra.report(status_report(&sr1)).is_none());
        let (id, delivered) = sra.report(status_report(&sr2)).unwrap();
        assert_eq!(id, msgid);
        assert!(delivered);
        assert!(sra.is_empty());

        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }
}
