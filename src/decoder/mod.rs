/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;

use std::io::Read;

use log::trace;

pub use error::DecodeError;
pub(crate) use error::description;

/// Text encoding of the input bytes, detected once when the decoder
/// is opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Decoded bytes produced per refill call.
const DECODE_BYTES: usize = 4096;

/// Capacity of the raw byte buffer. It is topped up from the source
/// whenever the undecoded remainder drops below two decode buffers'
/// worth, so a refill never stalls on a short source read.
const RAW_BYTES: usize = 3 * DECODE_BYTES;

const REPLACEMENT: char = '\u{fffd}';

// Length of a UTF-8 sequence by its leading byte; 0 marks a byte that
// cannot start a sequence. 0xc0/0xc1 are the overlong 2-byte leads.
const UTF8_LEN: [u8; 256] = build_utf8_len();

const fn build_utf8_len() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = match i {
            0x00..=0x7f => 1,
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 0,
        };
        i += 1;
    }
    table
}

/// Incremental byte-to-character decoder over a readable byte source.
///
/// The decoder detects the input encoding from the byte order mark (or
/// the shape of the first bytes) once at open, then serves the scanner
/// a window of already-validated UTF-8 text. The window is backed by
/// two equally sized buffers used in alternation: a
/// [refill()](Decoder::refill) call copies the caller's still-needed
/// suffix to the front of the spare buffer, decodes fresh characters
/// after it, and swaps. This is what lets a token span any number of
/// refill boundaries while staying one contiguous slice.
///
/// Malformed input sequences are replaced with U+FFFD without
/// desynchronizing the characters that follow. Two conditions are hard
/// errors instead: an input whose encoding cannot be recognized, and a
/// 4-byte UTF-8 sequence (supplementary-plane characters are not
/// supported). The first error is latched; refill calls after it report
/// that no more data is available.
pub struct Decoder<R> {
    source: R,
    encoding: Encoding,
    raw: Vec<u8>,
    raw_pos: usize,
    source_eof: bool,
    out: String,
    spare: String,
    resync: bool,
    failed: bool,
}

impl<R: Read> Decoder<R> {
    /// Opens a decoder over the source and detects the encoding.
    ///
    /// This performs the first source reads. An input that starts with
    /// none of the known byte order marks and does not look like
    /// unmarked UTF-8 XML text is rejected here.
    pub fn new(source: R) -> Result<Decoder<R>, DecodeError> {
        let mut decoder = Decoder {
            source,
            encoding: Encoding::Utf8,
            raw: Vec::with_capacity(RAW_BYTES),
            raw_pos: 0,
            source_eof: false,
            out: String::with_capacity(DECODE_BYTES),
            spare: String::with_capacity(DECODE_BYTES),
            resync: false,
            failed: false,
        };
        decoder.fill_raw()?;
        decoder.encoding = decoder.detect_encoding()?;
        trace!("detected encoding {:?}", decoder.encoding);

        Ok(decoder)
    }

    /// The encoding detected at open.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The current window of decoded text.
    pub fn text(&self) -> &str {
        &self.out
    }

    /// Refills the decoded window, keeping `out[retain_from..]` at the
    /// front of the new window.
    ///
    /// Returns true when new characters were produced, false when the
    /// source is exhausted (or a previous error already ended the
    /// stream). The retained suffix is copied, never aliased, so slices
    /// taken from the old window must not be used after this call.
    pub fn refill(&mut self, retain_from: usize) -> Result<bool, DecodeError> {
        if self.failed {
            return Ok(false);
        }
        self.spare.clear();
        self.spare.push_str(&self.out[retain_from..]);
        std::mem::swap(&mut self.out, &mut self.spare);
        let base = self.out.len();

        loop {
            if self.raw.len() - self.raw_pos < 2 * DECODE_BYTES && !self.source_eof {
                self.fill_raw()?;
            }
            match self.encoding {
                Encoding::Utf8 => self.decode_utf8()?,
                Encoding::Utf16Le | Encoding::Utf16Be => self.decode_utf16(),
            }
            if self.out.len() > base {
                return Ok(true);
            }
            if self.source_eof {
                return Ok(false);
            }
        }
    }

    fn detect_encoding(&mut self) -> Result<Encoding, DecodeError> {
        let raw = self.raw.as_slice();
        if raw.len() >= 2 && raw[0] == 0xff && raw[1] == 0xfe {
            self.raw_pos = 2;
            return Ok(Encoding::Utf16Le);
        }
        if raw.len() >= 2 && raw[0] == 0xfe && raw[1] == 0xff {
            self.raw_pos = 2;
            return Ok(Encoding::Utf16Be);
        }
        if raw.len() >= 3 && raw[0] == 0xef && raw[1] == 0xbb && raw[2] == 0xbf {
            self.raw_pos = 3;
            return Ok(Encoding::Utf8);
        }
        // No mark: XML text can only start with '<' or whitespace, and a
        // zero second byte would mean unmarked UTF-16LE which we do not
        // guess at.
        match raw.first() {
            Some(b'<' | b'\t' | b'\n' | b'\r' | b' ') if !(raw.len() >= 2 && raw[1] == 0) => {
                Ok(Encoding::Utf8)
            }
            _ => {
                self.failed = true;
                Err(DecodeError::BadEncoding(description::UNRECOGNIZED_ENCODING))
            }
        }
    }

    fn fill_raw(&mut self) -> Result<(), DecodeError> {
        self.raw.drain(..self.raw_pos);
        self.raw_pos = 0;
        while self.raw.len() < RAW_BYTES && !self.source_eof {
            let old_len = self.raw.len();
            self.raw.resize(RAW_BYTES, 0);
            match self.source.read(&mut self.raw[old_len..]) {
                Ok(0) => {
                    self.raw.truncate(old_len);
                    self.source_eof = true;
                }
                Ok(n) => {
                    self.raw.truncate(old_len + n);
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {
                    self.raw.truncate(old_len);
                }
                Err(err) => {
                    self.raw.truncate(old_len);
                    self.source_eof = true;
                    self.failed = true;
                    return Err(DecodeError::Io(err));
                }
            }
        }
        Ok(())
    }

    fn decode_utf8(&mut self) -> Result<(), DecodeError> {
        let fill_limit = self.out.len() + DECODE_BYTES;
        while self.out.len() < fill_limit {
            if self.resync {
                // Skip the bytes that still look like continuations of
                // the malformed sequence already replaced with U+FFFD.
                while self.raw_pos < self.raw.len() && self.raw[self.raw_pos] & 0xc0 == 0x80 {
                    self.raw_pos += 1;
                }
                if self.raw_pos >= self.raw.len() && !self.source_eof {
                    break;
                }
                self.resync = false;
            }
            if self.raw_pos >= self.raw.len() {
                break;
            }
            let b = self.raw[self.raw_pos];
            if b == 0 {
                // NUL is not a legal XML character.
                self.raw_pos += 1;
                self.out.push(REPLACEMENT);
                continue;
            }
            if b < 0x80 {
                let limit = self.raw.len().min(self.raw_pos + (fill_limit - self.out.len()));
                let mut end = self.raw_pos + 1;
                while end < limit {
                    let c = self.raw[end];
                    if c == 0 || c >= 0x80 {
                        break;
                    }
                    end += 1;
                }
                // SAFETY: every byte in raw_pos..end is ASCII.
                let run = unsafe { std::str::from_utf8_unchecked(&self.raw[self.raw_pos..end]) };
                self.out.push_str(run);
                self.raw_pos = end;
                continue;
            }
            let len = UTF8_LEN[b as usize] as usize;
            if len == 4 {
                self.failed = true;
                return Err(DecodeError::BadEncoding(description::SUPPLEMENTARY_CHAR));
            }
            if len == 0 {
                self.raw_pos += 1;
                self.out.push(REPLACEMENT);
                self.resync = true;
                continue;
            }
            if self.raw.len() - self.raw_pos < len {
                if !self.source_eof {
                    // The sequence may complete with the next source read.
                    break;
                }
                self.raw_pos += 1;
                self.out.push(REPLACEMENT);
                self.resync = true;
                continue;
            }
            let b1 = self.raw[self.raw_pos + 1];
            let decoded = if len == 2 {
                if b1 & 0xc0 == 0x80 {
                    Some((u32::from(b & 0x1f) << 6) | u32::from(b1 & 0x3f))
                } else {
                    None
                }
            } else {
                let b2 = self.raw[self.raw_pos + 2];
                if b1 & 0xc0 == 0x80 && b2 & 0xc0 == 0x80 {
                    let cp = (u32::from(b & 0x0f) << 12)
                        | (u32::from(b1 & 0x3f) << 6)
                        | u32::from(b2 & 0x3f);
                    if cp >= 0x800 && !(0xd800..=0xdfff).contains(&cp) {
                        Some(cp)
                    } else {
                        None
                    }
                } else {
                    None
                }
            };
            match decoded {
                Some(cp) => {
                    self.out.push(char::from_u32(cp).unwrap_or(REPLACEMENT));
                    self.raw_pos += len;
                }
                None => {
                    self.raw_pos += 1;
                    self.out.push(REPLACEMENT);
                    self.resync = true;
                }
            }
        }
        Ok(())
    }

    fn decode_utf16(&mut self) {
        let fill_limit = self.out.len() + DECODE_BYTES;
        while self.out.len() < fill_limit {
            let avail = self.raw.len() - self.raw_pos;
            if avail == 0 {
                break;
            }
            if avail == 1 {
                if !self.source_eof {
                    break;
                }
                // Dangling single byte at true end of file.
                self.raw_pos += 1;
                self.out.push(REPLACEMENT);
                continue;
            }
            let unit = self.read_unit(self.raw_pos);
            if (0xd800..0xdc00).contains(&unit) {
                if avail < 4 {
                    if !self.source_eof {
                        break;
                    }
                    self.raw_pos += 2;
                    self.out.push(REPLACEMENT);
                    continue;
                }
                let low = self.read_unit(self.raw_pos + 2);
                if (0xdc00..0xe000).contains(&low) {
                    let cp = 0x10000
                        + ((u32::from(unit) - 0xd800) << 10)
                        + (u32::from(low) - 0xdc00);
                    self.out.push(char::from_u32(cp).unwrap_or(REPLACEMENT));
                    self.raw_pos += 4;
                } else {
                    // Unpaired high surrogate; the next unit is kept for
                    // reprocessing on its own.
                    self.out.push(REPLACEMENT);
                    self.raw_pos += 2;
                }
            } else if unit == 0 || (0xdc00..0xe000).contains(&unit) {
                self.out.push(REPLACEMENT);
                self.raw_pos += 2;
            } else {
                self.out.push(char::from_u32(u32::from(unit)).unwrap_or(REPLACEMENT));
                self.raw_pos += 2;
            }
        }
    }

    fn read_unit(&self, pos: usize) -> u16 {
        let pair = [self.raw[pos], self.raw[pos + 1]];
        match self.encoding {
            Encoding::Utf16Le => u16::from_le_bytes(pair),
            _ => u16::from_be_bytes(pair),
        }
    }
}

#[cfg(test)]
mod tests;
