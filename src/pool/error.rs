/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::alloc::LayoutError;
use std::error::Error;
use std::fmt::Display;

/// Error type for memory allocation failures.
///
/// Pool methods return this error when the underlying global allocator
/// fails to provide a block, or when a requested size overflows what a
/// memory layout can describe. This is a fatal condition for a parse in
/// progress: the caller should drop the partially built document rather
/// than treat it as a recoverable syntax problem.
///
/// No details of the failed allocation are carried, keeping the error
/// as lightweight as possible on the successful hot path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AllocError;

impl Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not enough memory")
    }
}

impl Error for AllocError {}

impl From<LayoutError> for AllocError {
    fn from(_: LayoutError) -> Self {
        AllocError
    }
}
