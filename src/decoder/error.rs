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

/// Type of the error which stopped the byte decoding.
///
/// The decoder latches the first error: after one of these is returned,
/// further refill calls act as if the input had ended.
#[derive(Debug)]
pub enum DecodeError {
    /// The byte source failed to read. Treated as end of data with the
    /// underlying problem surfaced to the caller.
    Io(std::io::Error),

    /// The bytes cannot be decoded: the encoding was not recognized at
    /// open, or an unsupported construct was hit mid-stream.
    BadEncoding(&'static str),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Io(err) => write!(f, "unable to read data: {}", err),
            DecodeError::BadEncoding(msg) => write!(f, "encoding error: {}", msg),
        }
    }
}

impl Error for DecodeError {}

pub(crate) mod description {
    pub(crate) const UNRECOGNIZED_ENCODING: &str = "unrecognized text encoding";
    pub(crate) const SUPPLEMENTARY_CHAR: &str =
        "4-byte UTF-8 sequences (supplementary plane) are not supported";
}
