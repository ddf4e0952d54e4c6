/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Streaming XML parser with an arena-allocated read-only document
//! tree, built for loading configuration and data files.
//!
//! The input bytes are decoded incrementally (UTF-8 and UTF-16 with
//! byte-order-mark detection), scanned into structural events without
//! materializing the document, and assembled into a tree whose strings
//! live in one memory pool released as a unit. Use [Document] for the
//! tree API, or drive a [Scanner] with your own [ScanHandler] when the
//! events are all you need.
//!
//! Entity references, CDATA sections, and DTDs are intentionally not
//! processed, and supplementary-plane characters in UTF-8 input are
//! rejected; this keeps the parser small and predictable for the
//! trusted, tool-generated files it is meant to read.

mod decoder;
mod document;
mod pool;
mod scanner;

pub use pool::AllocError;
pub use pool::Pool;
pub use pool::PoolStats;

pub use decoder::DecodeError;
pub use decoder::Decoder;
pub use decoder::Encoding;

pub use scanner::Location;
pub use scanner::ScanError;
pub use scanner::ScanEvent;
pub use scanner::ScanHandler;
pub use scanner::Scanner;

pub use document::Attrs;
pub use document::Children;
pub use document::Document;
pub use document::Node;
