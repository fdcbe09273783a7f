use std::io::BufReader;

use bufr::{
    Error, Message,
    bits::BitCursor,
    descriptor::Descriptor,
    error::Mismatch,
    layout::Decode,
    message::{decode_cursor, decode_reader, decode_slice},
    scan,
    section::{ApplicationData, Section0, Section1, Section3, Section4, Section5},
    state::{Options, Policy},
};

const SYNOP: &str = "fixtures/synop.bufr";
const SYNOP_OPTIONAL: &str = "fixtures/synop-optional.bufr";
const BULLETIN: &str = "fixtures/bulletin.bufr";

fn identification(optional_section_exists: bool) -> Section1 {
    Section1 {
        length: 18,
        master_table: 0,
        sub_centre: 0,
        centre: 74,
        update_sequence_number: 0,
        optional_section_exists,
        data_category: 0,
        data_sub_category: 1,
        master_table_version: 13,
        local_table_version: 0,
        year: 2023,
        month: 10,
        day: 16,
        hours: 12,
        minutes: 0,
        reserved: 0,
    }
}

fn data_description() -> Section3 {
    Section3 {
        length: 21,
        reserved: 0,
        subset_count: 1,
        observed_data: true,
        compressed_data: false,
        descriptors: ["301001", "004001", "004002", "004003", "101000", "031001", "012101"]
            .iter()
            .map(|d| d.parse().unwrap())
            .collect(),
    }
}

#[test]
fn decode_slice_synop() {
    let data = std::fs::read(SYNOP).unwrap();
    let message = Message::decode(&data).unwrap();

    assert_eq!(
        message.section0,
        Section0 {
            magic_string: *b"BUFR",
            total_length: 65,
            version: 3,
        }
    );
    assert_eq!(message.section1, identification(false));
    assert_eq!(message.section2, None);
    assert_eq!(message.section3, data_description());
    assert_eq!(
        message.section4,
        Section4 {
            length: 14,
            reserved: 0,
            data: vec![0x07, 0x82, 0x3f, 0x3d, 0x20, 0x04, 0xdd, 0x36, 0xdc, 0x6e],
        }
    );
    assert_eq!(message.section5, Section5 { end: *b"7777" });
    assert_eq!(message.section0.total_length as usize, data.len());
}

#[test]
fn decode_slice_synop_optional() {
    let data = std::fs::read(SYNOP_OPTIONAL).unwrap();
    let message = Message::decode(&data).unwrap();

    assert_eq!(message.section0.total_length, 75);
    assert_eq!(message.section1, identification(true));

    let section2 = message.section2.unwrap();
    assert_eq!(section2.length, 10);
    assert_eq!(section2.application_data, b"EGRR\x01\x02");

    assert_eq!(message.section3, data_description());
    assert_eq!(message.section5.end, *b"7777");
}

#[test]
fn decode_reader_synop() {
    let file = std::fs::File::open(SYNOP_OPTIONAL).unwrap();
    let message = decode_reader(&mut BufReader::new(file), Options::default()).unwrap();

    let data = std::fs::read(SYNOP_OPTIONAL).unwrap();
    assert_eq!(message, Message::decode(&data).unwrap());
}

#[test]
fn decode_cursor_consumes_declared_length() {
    let mut data = std::fs::read(SYNOP).unwrap();
    data.extend_from_slice(b"trailing");

    let mut cursor = BitCursor::new(data.as_slice());
    let message = decode_cursor(&mut cursor, Options::default()).unwrap();

    assert_eq!(cursor.consumed(), message.section0.total_length as u64);
    assert!(cursor.is_aligned());
    assert_eq!(cursor.into_inner(), b"trailing");
}

#[test]
fn reject_bad_magic() {
    let mut data = std::fs::read(SYNOP).unwrap();
    data[0] = b'C';

    let err = Message::decode(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatMismatch {
            section: "Section0",
            field: "magic_string",
            position: 0,
            mismatch: Mismatch::Literal { expected: b"BUFR", ref found },
        } if found == b"CUFR"
    ));
}

#[test]
fn reject_bad_end() {
    let mut data = std::fs::read(SYNOP).unwrap();
    data[64] = b'8';

    let err = Message::decode(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatMismatch {
            section: "Section5",
            field: "end",
            position: 488,
            mismatch: Mismatch::Literal { expected: b"7777", .. },
        }
    ));
}

#[test]
fn reject_trailing_octets() {
    let mut data = std::fs::read(SYNOP).unwrap();
    data.extend_from_slice(b"GARBAGE");

    let err = Message::decode(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatMismatch {
            section: "Section5",
            field: "end",
            position: 520,
            mismatch: Mismatch::Trailing { remaining: 7 },
        }
    ));
}

#[test]
fn reject_total_length_mismatch() {
    let mut data = std::fs::read(SYNOP).unwrap();
    data[6] = 66;

    let err = Message::decode(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatMismatch {
            section: "Section0",
            mismatch: Mismatch::TotalLength {
                declared: 66,
                consumed: 65
            },
            ..
        }
    ));
}

#[test]
fn reject_odd_descriptor_remainder() {
    let mut data = std::fs::read(SYNOP).unwrap();
    // Shorten Section 3 by one octet, leaving half a descriptor.
    data[26 + 2] = 20;

    let err = Message::decode(&data).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatMismatch {
            section: "Section3",
            field: "descriptors",
            mismatch: Mismatch::Remainder {
                remaining: 13,
                unit: 2
            },
            ..
        }
    ));
}

#[test]
fn truncation_is_reported_at_field_boundary() {
    let data = std::fs::read(SYNOP).unwrap();

    // Octet 13 of Section 1, starting at octet 8 of the message.
    let err = Message::decode(&data[..20]).unwrap_err();
    assert!(matches!(
        err,
        Error::Truncated {
            section: "Section1",
            field: "year",
            position: 160,
        }
    ));

    // Inside the descriptor list, reported from its first octet.
    let err = Message::decode(&data[..40]).unwrap_err();
    assert!(matches!(
        err,
        Error::Truncated {
            section: "Section3",
            field: "descriptors",
            position: 264,
        }
    ));

    let err = Message::decode(&data[..63]).unwrap_err();
    assert!(matches!(
        err,
        Error::Truncated {
            section: "Section5",
            field: "end",
            position: 488,
        }
    ));
}

#[test]
fn every_truncation_fails() {
    for path in [SYNOP, SYNOP_OPTIONAL] {
        let data = std::fs::read(path).unwrap();

        for end in 0..data.len() {
            let err = Message::decode(&data[..end]).unwrap_err();
            assert!(
                matches!(err, Error::Truncated { .. }),
                "{path} truncated to {end} octets: {err}"
            );
        }
    }
}

/// Give Section 1 two octets beyond its layout.
fn padded_identification() -> Vec<u8> {
    let data = std::fs::read(SYNOP).unwrap();

    let mut padded = data[..26].to_vec();
    padded[6] += 2;
    padded[10] += 2;
    padded.extend_from_slice(&[0xAA, 0xBB]);
    padded.extend_from_slice(&data[26..]);
    padded
}

#[test]
fn strict_policy_rejects_section_padding() {
    let err = decode_slice(&padded_identification(), Options::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::FormatMismatch {
            section: "Section1",
            field: "length",
            mismatch: Mismatch::Length {
                declared: 20,
                consumed: 18
            },
            ..
        }
    ));
}

#[test]
fn lenient_policy_skips_section_padding() {
    let options = Options {
        policy: Policy::Lenient,
    };
    let message = decode_slice(&padded_identification(), options).unwrap();

    let mut expected = identification(false);
    expected.length = 20;
    assert_eq!(message.section1, expected);
    assert_eq!(message.section0.total_length, 67);
    assert_eq!(message.section3, data_description());
}

#[test]
fn scan_bulletin() {
    let data = std::fs::read(BULLETIN).unwrap();
    let messages = scan::messages(&data).collect::<Vec<_>>();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], std::fs::read(SYNOP).unwrap());
    assert_eq!(messages[1], std::fs::read(SYNOP_OPTIONAL).unwrap());

    for message in messages {
        Message::decode(message).unwrap();
    }
}

#[test]
fn scan_skips_false_starts_and_clamps() {
    let synop = std::fs::read(SYNOP).unwrap();

    let mut data = b"BUFR\x00\x00\x02\x03 noise ".to_vec();
    data.extend_from_slice(&synop[..40]);

    let messages = scan::messages(&data).collect::<Vec<_>>();
    assert_eq!(messages, [&synop[..40]]);
    assert!(matches!(
        Message::decode(messages[0]),
        Err(Error::Truncated { .. })
    ));
}

#[derive(Debug, PartialEq, Eq, Decode)]
struct Header {
    #[bufr(magic = b"EGRR")]
    tag: [u8; 4],
    #[bufr(bits = 8)]
    major: u8,
    #[bufr(bits = 8)]
    minor: u8,
}

impl ApplicationData for Header {
    fn supports(centre: u8, _: u8) -> bool {
        centre == 74
    }

    fn interpret(data: &[u8]) -> Result<Self, Error> {
        Header::decode(&mut BitCursor::new(data))
    }
}

#[test]
fn interpret_application_data() {
    let data = std::fs::read(SYNOP_OPTIONAL).unwrap();
    let message = Message::decode(&data).unwrap();
    let section2 = message.section2.as_ref().unwrap();

    let header = section2.interpret::<Header>(&message.section1).unwrap();
    assert_eq!(
        header,
        Header {
            tag: *b"EGRR",
            major: 1,
            minor: 2,
        }
    );

    let mut other = message.section1.clone();
    other.centre = 7;

    let err = section2.interpret::<Header>(&other).unwrap_err();
    assert!(matches!(
        err,
        Error::Unimplemented {
            section: "Section2",
            ..
        }
    ));
    assert!(!err.is_fatal());
}

#[test]
fn descriptors_keep_stream_order() {
    let data = std::fs::read(SYNOP).unwrap();
    let message = Message::decode(&data).unwrap();

    let text = message
        .section3
        .descriptors
        .iter()
        .map(Descriptor::to_string)
        .collect::<Vec<_>>();
    assert_eq!(
        text,
        ["301001", "004001", "004002", "004003", "101000", "031001", "012101"]
    );
}
