/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;
mod location;

use std::io::Read;
use std::ops::Range;

use memchr::memchr;

use crate::decoder::Decoder;
use crate::decoder::Encoding;

pub use error::ScanError;
pub(crate) use error::description;
pub use location::Location;

/// A structural event delivered by the [Scanner].
#[derive(Debug, Eq, PartialEq)]
pub enum ScanEvent<'a> {
    /// The scan started.
    DocOpen,

    /// The input was consumed without an error.
    DocClose,

    /// A start tag. The argument is the element name; it is delivered as
    /// soon as the name is scanned, before any of its attributes.
    TagOpen(&'a str),

    /// An end tag. A non-empty name closes the named element; an empty
    /// name closes the element opened by the preceding TagOpen without
    /// content (the `<name/>` form).
    TagClose(&'a str),

    /// An attribute of the last opened tag. Arguments are the attribute
    /// name and the attribute value; each attribute is a separate event.
    Attr(&'a str, &'a str),

    /// A fragment of character data. The flag is true on the first
    /// fragment of a text run; a run split by buffer refills delivers
    /// further fragments with the flag false, and consumers are expected
    /// to concatenate them.
    Text(&'a str, bool),
}

/// Receiver for the [Scanner] events.
///
/// Returning an error stops the scan immediately; [ScanError::Cancelled]
/// is reserved for handlers that want to abort without blaming the input.
pub trait ScanHandler {
    fn handle_event(&mut self, event: &ScanEvent) -> Result<(), ScanError>;
}

// Delimiter classification tables, one lookup per scanned byte. Bytes
// above 0x7f never terminate a token so multi-byte characters need no
// special casing in the scan loops.
struct StopTable([bool; 256]);

impl StopTable {
    const fn new(stops: &[u8]) -> StopTable {
        let mut table = [false; 256];
        let mut i = 0;
        while i < stops.len() {
            table[stops[i] as usize] = true;
            i += 1;
        }
        StopTable(table)
    }

    fn contains(&self, b: u8) -> bool {
        self.0[b as usize]
    }
}

const TAG_NAME_STOPS: StopTable = StopTable::new(b" \t\r\n>");
const ATTR_NAME_STOPS: StopTable = StopTable::new(b" \t\r\n=>/");
const ATTR_VALUE_STOPS: StopTable = StopTable::new(b" \t\r\n>/?");

fn is_xml_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Streaming XML tokenizer over a readable byte source.
///
/// The scanner walks the [Decoder]'s window of decoded characters and
/// delivers well-formedness-checked structural events to a
/// [ScanHandler] without ever materializing the whole document. Tokens
/// are passed as slices of the decode window whenever they fit; a token
/// cut by a window refill stays contiguous because the refill keeps the
/// open token at the front of the fresh buffer.
///
/// Comments are scanned and discarded. The `<?xml ...?>` declaration is
/// parsed and validated internally (version and encoding checks) and
/// produces no events. Entity references are not decoded: `&lt;` and
/// friends flow through as ordinary text.
///
/// # Examples
///
/// ```
/// use xylem::{ScanEvent, ScanError, ScanHandler, Scanner};
///
/// // Example handler which just prints the events
/// struct Handler {}
/// impl ScanHandler for Handler {
///     fn handle_event(&mut self, event: &ScanEvent) -> Result<(), ScanError> {
///         println!("scanned: {:?}", event);
///         Ok(())
///     }
/// }
/// let mut handler = Handler {};
///
/// let mut scanner = Scanner::new(&b"<doc page='4'>example</doc>"[..])?;
/// if let Err(err) = scanner.parse(&mut handler) {
///     println!("error at {}: {}", scanner.location(), err);
/// }
/// # Ok::<(), xylem::ScanError>(())
/// ```
pub struct Scanner<R> {
    decoder: Decoder<R>,
    pos: usize,
    prolog_seen: bool,
    text_first: bool,
    ws_carry: String,
    name_buf: String,
    location: Location,
}

impl<R: Read> Scanner<R> {
    /// Opens a scanner over the source.
    ///
    /// This performs the first source reads for encoding detection, so
    /// an unreadable or unrecognized source is rejected here.
    pub fn new(source: R) -> Result<Scanner<R>, ScanError> {
        Ok(Scanner {
            decoder: Decoder::new(source)?,
            pos: 0,
            prolog_seen: false,
            text_first: true,
            ws_carry: String::new(),
            name_buf: String::new(),
            location: Location::new(),
        })
    }

    /// The encoding detected when the scanner was opened.
    pub fn encoding(&self) -> Encoding {
        self.decoder.encoding()
    }

    /// The position of the scan cursor in the decoded stream.
    pub fn location(&self) -> Location {
        let mut location = self.location;
        for &b in &self.decoder.text().as_bytes()[..self.pos] {
            location.advance(b);
        }
        location
    }

    /// Scans the whole input, delivering events to the handler.
    ///
    /// The first error stops the scan; no further events are delivered
    /// after it.
    pub fn parse<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ScanError> {
        handler.handle_event(&ScanEvent::DocOpen)?;
        while self.scan_text(handler)? {
            self.parse_element(handler)?;
        }
        handler.handle_event(&ScanEvent::DocClose)?;
        Ok(())
    }

    fn refill(&mut self, keep_from: usize) -> Result<bool, ScanError> {
        for &b in &self.decoder.text().as_bytes()[..keep_from] {
            self.location.advance(b);
        }
        let more = self.decoder.refill(keep_from)?;
        self.pos -= keep_from;
        Ok(more)
    }

    fn peek(&mut self) -> Result<Option<u8>, ScanError> {
        while self.pos >= self.decoder.text().len() {
            if !self.refill(self.pos)? {
                return Ok(None);
            }
        }
        Ok(Some(self.decoder.text().as_bytes()[self.pos]))
    }

    fn skip_whitespace(&mut self) -> Result<Option<u8>, ScanError> {
        loop {
            match self.peek()? {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.pos += 1,
                other => return Ok(other),
            }
        }
    }

    fn expect(&mut self, byte: u8, desc: &'static str) -> Result<(), ScanError> {
        match self.peek()? {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(ScanError::BadXml(desc)),
        }
    }

    /// Reads forward to the next byte in the stop table. The token stays
    /// contiguous across refills; end of input before a stop byte is an
    /// error.
    fn read_token(&mut self, stops: &StopTable) -> Result<Range<usize>, ScanError> {
        let mut start = self.pos;
        loop {
            let end = {
                let bytes = self.decoder.text().as_bytes();
                let mut p = self.pos;
                while p < bytes.len() && !stops.contains(bytes[p]) {
                    p += 1;
                }
                p
            };
            self.pos = end;
            if end < self.decoder.text().len() {
                return Ok(start..end);
            }
            if !self.refill(start)? {
                return Err(ScanError::BadXml(description::UNEXPECTED_END));
            }
            start = 0;
        }
    }

    fn read_quoted(&mut self, quote: u8) -> Result<Range<usize>, ScanError> {
        let mut start = self.pos;
        loop {
            let hit = memchr(quote, &self.decoder.text().as_bytes()[self.pos..]);
            match hit {
                Some(off) => {
                    let end = self.pos + off;
                    self.pos = end + 1;
                    return Ok(start..end);
                }
                None => {
                    self.pos = self.decoder.text().len();
                    if !self.refill(start)? {
                        return Err(ScanError::BadXml(description::ATTR_UNTERMINATED_VALUE));
                    }
                    start = 0;
                }
            }
        }
    }

    /// Consumes character data up to the next `<`. Returns false when
    /// the input ended instead.
    fn scan_text<H: ScanHandler>(&mut self, handler: &mut H) -> Result<bool, ScanError> {
        self.text_first = true;
        self.ws_carry.clear();
        loop {
            let (end, found) = {
                let window = &self.decoder.text().as_bytes()[self.pos..];
                match memchr(b'<', window) {
                    Some(off) => (self.pos + off, true),
                    None => (self.decoder.text().len(), false),
                }
            };
            if found {
                self.emit_text(handler, self.pos, end, true)?;
                self.pos = end + 1;
                return Ok(true);
            }
            self.emit_text(handler, self.pos, end, false)?;
            self.pos = end;
            if !self.refill(self.pos)? {
                self.ws_carry.clear();
                return Ok(false);
            }
        }
    }

    /// Delivers one fragment of the current text run. Leading whitespace
    /// is trimmed only on the very first fragment; trailing whitespace
    /// of a non-final fragment is withheld and prepended to the next
    /// one, so the assembled run is trailing-trimmed no matter where the
    /// refill boundaries fall.
    fn emit_text<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
        end: usize,
        is_final: bool,
    ) -> Result<(), ScanError> {
        let mut frag = &self.decoder.text()[start..end];
        if self.text_first {
            // Anything withheld so far would be leading whitespace.
            self.ws_carry.clear();
            frag = frag.trim_start_matches(is_xml_ws);
        }
        let body = frag.trim_end_matches(is_xml_ws);
        if body.is_empty() {
            if is_final {
                self.ws_carry.clear();
            } else {
                self.ws_carry.push_str(frag);
            }
            return Ok(());
        }

        let joined;
        let piece = if self.ws_carry.is_empty() {
            body
        } else {
            joined = format!("{}{}", self.ws_carry, body);
            &joined
        };
        handler.handle_event(&ScanEvent::Text(piece, self.text_first))?;
        self.text_first = false;
        self.ws_carry.clear();
        if !is_final {
            self.ws_carry.push_str(&frag[body.len()..]);
        }
        Ok(())
    }

    /// Scans one element, entered with the cursor just past the `<`.
    fn parse_element<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ScanError> {
        match self.peek()? {
            None => return Err(ScanError::BadXml(description::UNEXPECTED_END)),
            Some(b'!') => {
                self.pos += 1;
                return self.scan_comment();
            }
            Some(_) => (),
        }
        let range = self.read_token(&TAG_NAME_STOPS)?;
        let text = self.decoder.text();
        let stop = text.as_bytes()[range.end];
        let token = &text[range];

        if let Some(name) = token.strip_prefix('/') {
            handler.handle_event(&ScanEvent::TagClose(name))?;
            self.pos += 1;
            if stop != b'>' {
                self.skip_whitespace()?;
                self.expect(b'>', description::CLOSE_TAG_EXTRA)?;
            }
            return Ok(());
        }

        if let Some(rest) = token.strip_prefix('?') {
            if self.prolog_seen {
                return Err(ScanError::BadXml(description::REPEATED_DECLARATION));
            }
            self.prolog_seen = true;
            if rest.ends_with('?') && stop == b'>' {
                self.pos += 1;
                return Ok(());
            }
            if stop == b'>' {
                return Err(ScanError::BadXml(description::DECL_MISSING_END));
            }
            self.pos += 1;
            return self.scan_attributes(handler, true);
        }

        if let Some(name) = token.strip_suffix('/') {
            if stop != b'>' {
                return Err(ScanError::BadXml(description::UNEXPECTED_SLASH));
            }
            handler.handle_event(&ScanEvent::TagOpen(name))?;
            handler.handle_event(&ScanEvent::TagClose(""))?;
            self.pos += 1;
            return Ok(());
        }

        if token.ends_with('?') {
            return Err(ScanError::BadXml(description::UNEXPECTED_DECL_END));
        }

        handler.handle_event(&ScanEvent::TagOpen(token))?;
        self.pos += 1;
        if stop == b'>' {
            return Ok(());
        }
        self.scan_attributes(handler, false)
    }

    /// Consumes attributes until the tag ends. Inside the declaration the
    /// attributes are checked and swallowed instead of delivered.
    fn scan_attributes<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        in_prolog: bool,
    ) -> Result<(), ScanError> {
        loop {
            match self.skip_whitespace()? {
                None => return Err(ScanError::BadXml(description::UNEXPECTED_END)),
                Some(b'/') => {
                    self.pos += 1;
                    if in_prolog {
                        return Err(ScanError::BadXml(description::UNEXPECTED_SLASH));
                    }
                    self.expect(b'>', description::UNEXPECTED_SLASH)?;
                    handler.handle_event(&ScanEvent::TagClose(""))?;
                    return Ok(());
                }
                Some(b'?') => {
                    self.pos += 1;
                    if !in_prolog {
                        return Err(ScanError::BadXml(description::UNEXPECTED_DECL_END));
                    }
                    return self.expect(b'>', description::DECL_MISSING_END);
                }
                Some(b'>') => {
                    self.pos += 1;
                    if in_prolog {
                        return Err(ScanError::BadXml(description::DECL_MISSING_END));
                    }
                    return Ok(());
                }
                Some(_) => self.scan_attribute(handler, in_prolog)?,
            }
        }
    }

    fn scan_attribute<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        in_prolog: bool,
    ) -> Result<(), ScanError> {
        let range = self.read_token(&ATTR_NAME_STOPS)?;
        if range.is_empty() {
            return Err(ScanError::BadXml(description::ATTR_EMPTY_NAME));
        }
        // The name is kept in an owned buffer: reading the value may
        // refill the decode window and invalidate slices into it.
        self.name_buf.clear();
        let name_range = range;
        {
            let text = self.decoder.text();
            self.name_buf.push_str(&text[name_range]);
        }
        self.skip_whitespace()?;
        self.expect(b'=', description::ATTR_MISSING_EQUALS)?;
        let value_range = match self.skip_whitespace()? {
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 1;
                self.read_quoted(q)?
            }
            Some(_) => {
                let range = self.read_token(&ATTR_VALUE_STOPS)?;
                if range.is_empty() {
                    return Err(ScanError::BadXml(description::ATTR_MISSING_VALUE));
                }
                range
            }
            None => return Err(ScanError::BadXml(description::UNEXPECTED_END)),
        };
        let value = &self.decoder.text()[value_range];
        if in_prolog {
            self.check_declaration_attr(value)
        } else {
            handler.handle_event(&ScanEvent::Attr(&self.name_buf, value))
        }
    }

    fn check_declaration_attr(&self, value: &str) -> Result<(), ScanError> {
        if self.name_buf == "version" {
            if value != "1.0" {
                return Err(ScanError::BadXml(description::DECL_BAD_VERSION));
            }
        } else if self.name_buf == "encoding" {
            let class = match self.decoder.encoding() {
                Encoding::Utf8 => "utf-8",
                Encoding::Utf16Le | Encoding::Utf16Be => "utf-16",
            };
            if !value.eq_ignore_ascii_case(class) {
                return Err(ScanError::BadXml(description::DECL_ENCODING_MISMATCH));
            }
        }
        Ok(())
    }

    /// Scans a `<!--...-->` comment to its end and discards it. Any
    /// other `<!` form is unsupported.
    fn scan_comment(&mut self) -> Result<(), ScanError> {
        for _ in 0..2 {
            match self.peek()? {
                Some(b'-') => self.pos += 1,
                _ => return Err(ScanError::BadXml(description::UNSUPPORTED_MARKUP)),
            }
        }
        let mut dashes = 0;
        loop {
            match self.peek()? {
                None => return Err(ScanError::BadXml(description::UNEXPECTED_END)),
                Some(b'-') => {
                    dashes += 1;
                    self.pos += 1;
                }
                Some(b'>') if dashes >= 2 => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {
                    dashes = 0;
                    self.pos += 1;
                }
            }
        }
    }
}
