/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Display;

/// A position in the decoded text stream.
///
/// Returned from [location()](crate::Scanner::location) and used to
/// point at the offending place when a load fails. Positions count
/// decoded characters' UTF-8 bytes, so for UTF-16 inputs they will not
/// match raw file offsets, but lines and columns stay meaningful.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Location {
    /// Byte position in the decoded stream.
    pub bytes: usize,
    /// Lines seen so far, separated by the newline character.
    pub lines: usize,
    /// Bytes after the last newline character.
    pub column: usize,
}

impl Location {
    /// Creates a location at the beginning of the stream.
    pub fn new() -> Self {
        Location {
            bytes: 0,
            lines: 0,
            column: 0,
        }
    }

    pub(super) fn advance(&mut self, c: u8) {
        self.bytes += 1;
        if c == b'\n' {
            self.lines += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::new()
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "byte: {}, line: {}, column: {}",
            self.bytes, self.lines, self.column
        )
    }
}
