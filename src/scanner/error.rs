/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::error::Error;
use std::fmt::Display;

use crate::decoder::DecodeError;
use crate::pool::AllocError;

/// Type of the error which stopped the scan.
///
/// The first error wins: once the scanner returns one of these no more
/// handler events are delivered, and the caller should consider the
/// document unusable. Location of the error is available via
/// [location()](super::Scanner::location).
#[derive(Debug)]
pub enum ScanError {
    /// Memory for the document storage could not be allocated. This is
    /// fatal for the parse, not a problem with the input.
    NoMemory,

    /// The byte source failed to read.
    Io(std::io::Error),

    /// The input bytes could not be decoded: unrecognized encoding or an
    /// unsupported character sequence.
    BadEncoding(&'static str),

    /// A syntax error was encountered in the XML input. Typical action
    /// is reporting the description and location so the document can be
    /// fixed.
    BadXml(&'static str),

    /// The handler asked to stop. This is for callers' handlers to abort
    /// processing while signalling that the interruption was not caused
    /// by the input.
    Cancelled,
}

impl Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::NoMemory => write!(f, "not enough memory"),
            ScanError::Io(err) => write!(f, "unable to read data: {}", err),
            ScanError::BadEncoding(msg) => write!(f, "encoding error: {}", msg),
            ScanError::BadXml(msg) => write!(f, "invalid xml syntax: {}", msg),
            ScanError::Cancelled => write!(f, "parsing cancelled"),
        }
    }
}

impl Error for ScanError {}

impl From<DecodeError> for ScanError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io(err) => ScanError::Io(err),
            DecodeError::BadEncoding(msg) => ScanError::BadEncoding(msg),
        }
    }
}

impl From<AllocError> for ScanError {
    fn from(_: AllocError) -> Self {
        ScanError::NoMemory
    }
}

pub(crate) mod description {
    pub(crate) const UNEXPECTED_END: &str = "unexpected end of data";
    pub(crate) const UNSUPPORTED_MARKUP: &str = "unsupported '<!' construct";
    pub(crate) const CLOSE_TAG_EXTRA: &str = "unexpected characters in closing tag";
    pub(crate) const ATTR_EMPTY_NAME: &str = "attribute without a name";
    pub(crate) const ATTR_MISSING_EQUALS: &str = "attribute without '=' before the value";
    pub(crate) const ATTR_MISSING_VALUE: &str = "attribute without a value";
    pub(crate) const ATTR_UNTERMINATED_VALUE: &str = "unterminated quoted value";
    pub(crate) const UNEXPECTED_SLASH: &str = "unexpected '/' in tag";
    pub(crate) const UNEXPECTED_DECL_END: &str = "unexpected '?>'";
    pub(crate) const REPEATED_DECLARATION: &str = "repeated XML declaration";
    pub(crate) const DECL_MISSING_END: &str = "XML declaration must end with '?>'";
    pub(crate) const DECL_BAD_VERSION: &str = "unsupported XML version";
    pub(crate) const DECL_ENCODING_MISMATCH: &str =
        "declared encoding does not match the detected encoding";
}
