/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;

// Serves at most `chunk` bytes per read call to exercise the refill
// paths the same way a slow file or socket would.
struct ChunkedSource<'a> {
    bytes: &'a [u8],
    pos: usize,
    chunk: usize,
}

impl<'a> ChunkedSource<'a> {
    fn new(bytes: &'a [u8], chunk: usize) -> ChunkedSource<'a> {
        ChunkedSource { bytes, pos: 0, chunk }
    }
}

impl Read for ChunkedSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.bytes.len() - self.pos);
        buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct FailingSource;

impl Read for FailingSource {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("broken pipe"))
    }
}

fn decode_all(bytes: &[u8]) -> String {
    let mut decoder = Decoder::new(bytes).unwrap();
    let mut result = String::new();
    loop {
        result.push_str(decoder.text());
        if !decoder.refill(decoder.text().len()).unwrap() {
            break;
        }
    }
    result
}

#[test]
fn bom_detection() {
    let decoder = Decoder::new(&b"\xef\xbb\xbf<r/>"[..]).unwrap();
    assert_eq!(decoder.encoding(), Encoding::Utf8);

    let decoder = Decoder::new(&b"\xff\xfe<\x00r\x00"[..]).unwrap();
    assert_eq!(decoder.encoding(), Encoding::Utf16Le);

    let decoder = Decoder::new(&b"\xfe\xff\x00<\x00r"[..]).unwrap();
    assert_eq!(decoder.encoding(), Encoding::Utf16Be);

    let decoder = Decoder::new(&b"<r/>"[..]).unwrap();
    assert_eq!(decoder.encoding(), Encoding::Utf8);

    let decoder = Decoder::new(&b"  \t\r\n<r/>"[..]).unwrap();
    assert_eq!(decoder.encoding(), Encoding::Utf8);
}

#[test]
fn unrecognized_encodings() {
    assert!(matches!(
        Decoder::new(&b"r<a/>"[..]),
        Err(DecodeError::BadEncoding(_))
    ));
    // Unmarked UTF-16LE is not guessed at.
    assert!(matches!(
        Decoder::new(&b"<\x00r\x00"[..]),
        Err(DecodeError::BadEncoding(_))
    ));
    assert!(matches!(
        Decoder::new(&b""[..]),
        Err(DecodeError::BadEncoding(_))
    ));
}

#[test]
fn utf8_passthrough() {
    assert_eq!(decode_all(b"<a>hello</a>"), "<a>hello</a>");
    assert_eq!(
        decode_all("<a>бж\u{900}</a>".as_bytes()),
        "<a>бж\u{900}</a>"
    );
    assert_eq!(decode_all(b"\xef\xbb\xbf<r/>"), "<r/>");
}

#[test]
fn utf8_malformed_becomes_replacement() {
    // Bare continuation byte.
    assert_eq!(decode_all(b"<a>\x80b</a>"), "<a>\u{fffd}b</a>");
    // Overlong 2-byte lead.
    assert_eq!(decode_all(b"<a>\xc0\xafb</a>"), "<a>\u{fffd}b</a>");
    // Truncated 3-byte sequence resynchronizes on the next character.
    assert_eq!(decode_all(b"<a>\xe3\x8fb</a>"), "<a>\u{fffd}b</a>");
    // Surrogate encoded as UTF-8.
    assert_eq!(decode_all(b"<a>\xed\xa0\x80b</a>"), "<a>\u{fffd}b</a>");
    // Overlong 3-byte sequence.
    assert_eq!(decode_all(b"<a>\xe0\x80\xafb</a>"), "<a>\u{fffd}b</a>");
    // Truncated sequence at end of file.
    assert_eq!(decode_all(b"<a>\xe3\x8f"), "<a>\u{fffd}");
}

#[test]
fn utf8_nul_becomes_replacement() {
    assert_eq!(decode_all(b"<a>\x00</a>"), "<a>\u{fffd}</a>");
}

#[test]
fn utf8_supplementary_is_fatal() {
    let mut decoder = Decoder::new(&b"<a>\xf0\x9d\x84\x9e</a>"[..]).unwrap();
    let mut err = None;
    loop {
        match decoder.refill(decoder.text().len()) {
            Ok(true) => (),
            Ok(false) => break,
            Err(e) => {
                err = Some(e);
                break;
            }
        }
    }
    assert!(matches!(
        err,
        Some(DecodeError::BadEncoding(description::SUPPLEMENTARY_CHAR))
    ));
    // The error is latched; further calls report end of data.
    assert!(!decoder.refill(0).unwrap());
}

fn utf16le(s: &str) -> Vec<u8> {
    let mut bytes = vec![0xff, 0xfe];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[test]
fn utf16_le_decoding() {
    assert_eq!(decode_all(&utf16le("<r a='1'>x</r>")), "<r a='1'>x</r>");
    assert_eq!(decode_all(&utf16le("<a>Чингис</a>")), "<a>Чингис</a>");
}

#[test]
fn utf16_be_decoding() {
    let mut bytes = vec![0xfe, 0xff];
    for unit in "<a>х</a>".encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    assert_eq!(decode_all(&bytes), "<a>х</a>");
}

#[test]
fn utf16_surrogate_pairs_combine() {
    // U+1D11E musical G clef.
    assert_eq!(decode_all(&utf16le("<a>\u{1d11e}</a>")), "<a>\u{1d11e}</a>");
}

#[test]
fn utf16_unpaired_surrogates() {
    // High surrogate followed by a normal unit.
    let mut bytes = vec![0xff, 0xfe, 0x34, 0xd8];
    bytes.extend_from_slice(&(b'x' as u16).to_le_bytes());
    assert_eq!(decode_all(&bytes), "\u{fffd}x");

    // Lone low surrogate.
    let bytes = vec![0xff, 0xfe, 0x01, 0xdc];
    assert_eq!(decode_all(&bytes), "\u{fffd}");

    // High surrogate at end of file.
    let bytes = vec![0xff, 0xfe, 0x34, 0xd8];
    assert_eq!(decode_all(&bytes), "\u{fffd}");
}

#[test]
fn utf16_dangling_byte() {
    let mut bytes = utf16le("<a>");
    bytes.push(0x41);
    assert_eq!(decode_all(&bytes), "<a>\u{fffd}");
}

#[test]
fn chunked_reads_decode_identically() {
    let text = "<doc attr='value'>данные numbers 12345</doc>";
    for chunk in [1, 2, 4, 7, 4096] {
        let mut decoder = Decoder::new(ChunkedSource::new(text.as_bytes(), chunk)).unwrap();
        let mut result = String::new();
        loop {
            result.push_str(decoder.text());
            if !decoder.refill(decoder.text().len()).unwrap() {
                break;
            }
        }
        assert_eq!(result, text);
    }
}

#[test]
fn retained_suffix_survives_refill() {
    let long = format!("<tag>{}</tag>", "y".repeat(3 * DECODE_BYTES));
    let mut decoder = Decoder::new(ChunkedSource::new(long.as_bytes(), 512)).unwrap();
    // Keep the whole window on every refill; the token must stay one
    // contiguous, uncorrupted slice no matter how many refills happen.
    while decoder.refill(0).unwrap() {}
    assert_eq!(decoder.text(), long);
}

#[test]
fn read_failure_surfaces() {
    assert!(matches!(
        Decoder::new(FailingSource),
        Err(DecodeError::Io(_))
    ));
}
