//! Packet framing for the Keymaze serial protocol
//!
//! Request: `prefix | len (u16 BE) | command | params | checksum`, where
//! `len = 1 + params.len()` and the checksum XORs every byte after the prefix.
//!
//! Response: `command | len (u16 BE) | body | checksum`, where the checksum
//! XORs the two length bytes and the body.

use std::fmt::Write;

/// Size of a response header (command echo + body length)
pub const HEADER_LEN: usize = 3;

/// Running XOR over every byte of every part
pub fn checksum(parts: &[&[u8]]) -> u8 {
    parts
        .iter()
        .flat_map(|part| part.iter())
        .fold(0u8, |acc, b| acc ^ b)
}

/// Frame a request for the watch
pub fn encode_request(prefix: u8, command: u8, params: &[u8]) -> Vec<u8> {
    let len = (1 + params.len()) as u16;
    let mut out = Vec::with_capacity(params.len() + 5);
    out.push(prefix);
    out.extend_from_slice(&len.to_be_bytes());
    out.push(command);
    out.extend_from_slice(params);
    out.push(checksum(&[&out[1..]]));
    out
}

/// Decoded response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub command: u8,
    pub length: u16,
}

impl ResponseHeader {
    /// Parse the first three bytes of a response
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [command, hi, lo, ..] => Some(Self {
                command: *command,
                length: u16::from_be_bytes([*hi, *lo]),
            }),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let [hi, lo] = self.length.to_be_bytes();
        [self.command, hi, lo]
    }

    /// Checksum the watch appends after `body`
    pub fn checksum(self, body: &[u8]) -> u8 {
        checksum(&[&self.length.to_be_bytes(), body])
    }
}

/// Frame a response as the watch would send it
pub fn encode_response(command: u8, body: &[u8]) -> Vec<u8> {
    let header = ResponseHeader {
        command,
        length: body.len() as u16,
    };
    let mut out = Vec::with_capacity(body.len() + HEADER_LEN + 1);
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(body);
    out.push(header.checksum(body));
    out
}

/// Classic 16-bytes-per-line hex dump for debug logs
pub fn hexdump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let printable: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        let _ = writeln!(out, "{:06x}   {:<48}   {}", line * 16, hex.join(" "), printable);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request_info() {
        let frame = encode_request(0x02, 0x85, &[]);
        // len = 1, command 0x85, checksum = 0x00 ^ 0x01 ^ 0x85
        assert_eq!(frame, vec![0x02, 0x00, 0x01, 0x85, 0x84]);
    }

    #[test]
    fn test_encode_request_with_params() {
        let frame = encode_request(0x02, 0x80, &[0x00, 0x01, 0x00, 0x07]);
        assert_eq!(&frame[..4], &[0x02, 0x00, 0x05, 0x80]);
        assert_eq!(&frame[4..8], &[0x00, 0x01, 0x00, 0x07]);
        assert_eq!(*frame.last().unwrap(), checksum(&[&frame[1..8]]));
    }

    #[test]
    fn test_checksum_validates_itself() {
        let body: Vec<u8> = (0u8..=200).collect();
        let frame = encode_response(0x78, &body);
        let header = ResponseHeader::parse(&frame).unwrap();
        let received = *frame.last().unwrap();
        assert_eq!(header.checksum(&frame[3..frame.len() - 1]), received);
    }

    #[test]
    fn test_checksum_detects_single_byte_corruption() {
        let body: Vec<u8> = vec![0x10, 0x20, 0x30, 0x40, 0x55, 0xaa];
        let header = ResponseHeader {
            command: 0x85,
            length: body.len() as u16,
        };
        let good = header.checksum(&body);
        for i in 0..body.len() {
            let mut corrupted = body.clone();
            corrupted[i] ^= 0x5a;
            assert_ne!(header.checksum(&corrupted), good, "byte {} undetected", i);
        }
    }

    #[test]
    fn test_header_parse() {
        assert_eq!(
            ResponseHeader::parse(&[0x81, 0x01, 0x2c]),
            Some(ResponseHeader {
                command: 0x81,
                length: 300
            })
        );
        assert_eq!(ResponseHeader::parse(&[0x81, 0x01]), None);
    }

    #[test]
    fn test_hexdump_layout() {
        let dump = hexdump(b"Keymaze\x00\x01");
        assert!(dump.starts_with("000000   4b 65 79"));
        assert!(dump.trim_end().ends_with("Keymaze.."));
    }
}
