//! Payload builders and parsers for the XL feature and output reports.

use deck_core::KeyIndex;

use crate::buffer::ByteBuffer;

/// Length of every feature report payload, both directions
pub const COMMAND_LEN: usize = 32;
pub const MAX_PACKET_SIZE: usize = 1024;
pub const PACKET_HEADER_LEN: usize = 8;
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - PACKET_HEADER_LEN;

/// HID report ids
pub mod report {
    /// Output report carrying image parts
    pub const IMAGE: u8 = 0x02;
    /// Feature report for device commands
    pub const CUSTOM_COMMAND: u8 = 0x03;
    pub const FIRMWARE_VERSION: u8 = 0x05;
    pub const SERIAL_NUMBER: u8 = 0x06;
}

/// First payload byte of a report, selecting the command
pub mod command {
    pub const RESET_LOGO: u8 = 0x02;
    pub const IMAGE_UPLOAD: u8 = 0x07;
    pub const SET_BRIGHTNESS: u8 = 0x08;
}

/// Offset of the text in each identity reply
const FIRMWARE_OFFSET: usize = 5;
const SERIAL_OFFSET: usize = 6;

macro_rules! impl_feature_abi {
    [$(
        $( #[doc = $( $doc:tt )* ] )*
        fn $name:ident ( [ $( $hardcode:expr ),* ] $(, $arg:ident: u8 )* );
    )+] => {
        $(
            $(#[doc = concat!("Construct a feature payload for ", $($doc)*)])*
            #[allow(unused_mut, unused_assignments)]
            pub fn $name( $( $arg: u8 ),* ) -> ByteBuffer {
                let mut buf = ByteBuffer::empty(COMMAND_LEN);
                let mut cur = 0;
                $(
                    buf.set(cur, $hardcode);
                    cur += 1;
                )*
                $(
                    buf.set(cur, $arg);
                    cur += 1;
                )*
                buf
            }
        )*
    };
}

impl_feature_abi![
    /// showing the vendor logo on every key
    fn reset_to_logo([command::RESET_LOGO]);

    /// setting the display brightness in percent. Range is checked by the caller.
    fn set_brightness([command::SET_BRIGHTNESS], percent: u8);
];

/// Parse the firmware version out of a report 5 reply
pub fn firmware_version(reply: &[u8]) -> String {
    identity_string(reply, FIRMWARE_OFFSET)
}

/// Parse the serial number out of a report 6 reply
pub fn serial_number(reply: &[u8]) -> String {
    identity_string(reply, SERIAL_OFFSET)
}

fn identity_string(reply: &[u8], offset: usize) -> String {
    let mut data = ByteBuffer::of(reply);
    data.slice_front(offset);
    data.trim_nul();
    data.to_utf8()
}

/// Write the 8 byte image part header into the front of `buf`
fn write_image_header(buf: &mut [u8], key: KeyIndex, part: u16, is_last: bool, body_len: u16) {
    buf[0] = report::IMAGE;
    buf[1] = command::IMAGE_UPLOAD;
    buf[2] = key.as_u8();
    buf[3] = is_last as u8;
    buf[4..6].copy_from_slice(&body_len.to_le_bytes());
    buf[6..8].copy_from_slice(&part.to_le_bytes());
}

/// Split an encoded image into 1024 byte output reports for `key`.
///
/// The first byte of each packet is the report id. An empty image yields no packets.
pub fn image_packets(key: KeyIndex, image: &[u8]) -> Vec<ByteBuffer> {
    let parts = image.len().div_ceil(MAX_PAYLOAD_SIZE);
    image
        .chunks(MAX_PAYLOAD_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let mut buf = vec![0u8; MAX_PACKET_SIZE];
            write_image_header(&mut buf, key, i as u16, i + 1 == parts, chunk.len() as u16);
            buf[PACKET_HEADER_LEN..PACKET_HEADER_LEN + chunk.len()].copy_from_slice(chunk);
            ByteBuffer::from(buf)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImagePacket;

    fn key(i: usize) -> KeyIndex {
        KeyIndex::new(i).unwrap()
    }

    #[test]
    fn feature_payloads() {
        let mut expected = [0u8; COMMAND_LEN];
        expected[0] = 0x08;
        expected[1] = 50;
        assert_eq!(set_brightness(50).as_slice(), &expected);
        assert_eq!(set_brightness(50), set_brightness(50));

        let mut expected = [0u8; COMMAND_LEN];
        expected[0] = 0x02;
        assert_eq!(reset_to_logo().as_slice(), &expected);
    }

    #[test]
    fn identity_parsing() {
        let mut reply = [0u8; COMMAND_LEN];
        reply[5..11].copy_from_slice(b"1.0.17");
        assert_eq!(firmware_version(&reply), "1.0.17");

        let mut reply = [0u8; COMMAND_LEN];
        reply[0] = 0x06;
        reply[6..18].copy_from_slice(b"CL12K1A00042");
        assert_eq!(serial_number(&reply), "CL12K1A00042");

        // short replies are not an error, just empty
        assert_eq!(serial_number(&[6, 0, 0]), "");
    }

    #[test]
    fn packet_boundaries() {
        assert!(image_packets(key(0), &[]).is_empty());

        let packets = image_packets(key(3), &[0xAB; 1016]);
        assert_eq!(packets.len(), 1);
        let p = ImagePacket::parse(packets[0].as_slice()).unwrap();
        assert_eq!((p.is_last(), p.part(), p.body_len()), (true, 0, 1016));

        let packets = image_packets(key(3), &[0xAB; 1017]);
        let parsed: Vec<_> = packets
            .iter()
            .map(|p| ImagePacket::parse(p.as_slice()).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!((parsed[0].body_len(), parsed[0].part(), parsed[0].is_last()), (1016, 0, false));
        assert_eq!((parsed[1].body_len(), parsed[1].part(), parsed[1].is_last()), (1, 1, true));
    }

    #[test]
    fn two_part_upload_headers() {
        let image: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
        let packets = image_packets(key(10), &image);
        assert_eq!(packets.len(), 2);

        let first = packets[0].as_slice();
        assert_eq!(&first[..8], &[0x02, 0x07, 0x0A, 0x00, 0xF8, 0x03, 0x00, 0x00]);
        assert_eq!(&first[8..], &image[..1016]);

        let second = packets[1].as_slice();
        assert_eq!(&second[..8], &[0x02, 0x07, 0x0A, 0x01, 0xE4, 0x01, 0x01, 0x00]);
        assert_eq!(&second[8..492], &image[1016..]);
        assert!(second[492..].iter().all(|&b| b == 0));
        assert_eq!(second[492..].len(), 532);
    }

    #[test]
    fn packets_reassemble() {
        for len in [1usize, 7, 1015, 1016, 1017, 2032, 2033, 5000] {
            let image: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let packets = image_packets(key(31), &image);

            let mut joined = Vec::new();
            for (i, packet) in packets.iter().enumerate() {
                assert_eq!(packet.len(), MAX_PACKET_SIZE);
                let p = ImagePacket::parse(packet.as_slice()).unwrap();
                assert_eq!(p.key(), 31);
                assert_eq!(p.part() as usize, i);
                assert_eq!(p.is_last(), i + 1 == packets.len());
                joined.extend_from_slice(p.payload());
            }
            assert_eq!(joined, image, "length {len}");
        }
    }
}
