/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod builder;
mod error;
mod iterators;

use std::fmt::Debug;
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::decoder::Encoding;
use crate::pool::Pool;
use crate::pool::PoolStats;
use crate::scanner::Location;
use crate::scanner::ScanError;
use crate::scanner::Scanner;

use builder::TreeBuilder;
pub use iterators::Attrs;
pub use iterators::Children;

// A string view into pool memory. The pool never moves or frees a
// returned allocation before it is dropped as a whole, so the view stays
// valid for as long as the owning Document exists.
#[derive(Clone, Copy)]
struct StrRef {
    ptr: *const u8,
    len: usize,
}

impl StrRef {
    const EMPTY: StrRef = StrRef {
        ptr: std::ptr::null(),
        len: 0,
    };

    fn new(s: &str) -> StrRef {
        StrRef {
            ptr: s.as_ptr(),
            len: s.len(),
        }
    }

    // SAFETY: caller ties 'a to a borrow of the Document owning the pool
    // the view points into.
    unsafe fn as_str<'a>(&self) -> &'a str {
        if self.len == 0 {
            return "";
        }
        unsafe {
            let slice = std::slice::from_raw_parts(self.ptr, self.len);
            std::str::from_utf8_unchecked(slice)
        }
    }
}

// A typed array view into pool memory, same validity rule as StrRef.
struct SliceRef<T> {
    ptr: *const T,
    len: usize,
}

impl<T> SliceRef<T> {
    fn empty() -> SliceRef<T> {
        SliceRef {
            ptr: std::ptr::null(),
            len: 0,
        }
    }

    fn new(s: &[T]) -> SliceRef<T> {
        SliceRef {
            ptr: s.as_ptr(),
            len: s.len(),
        }
    }

    // SAFETY: caller ties 'a to a borrow of the Document owning the pool
    // the view points into.
    unsafe fn as_slice<'a>(&self) -> &'a [T] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl<T> Clone for SliceRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SliceRef<T> {}

#[derive(Clone, Copy)]
struct AttrData {
    name: StrRef,
    value: StrRef,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    fn new(index: usize) -> Result<NodeId, ScanError> {
        u32::try_from(index).map(NodeId).map_err(|_| ScanError::NoMemory)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

struct NodeData {
    name: StrRef,
    data: StrRef,
    parent: Option<NodeId>,
    children: SliceRef<NodeId>,
    attrs: SliceRef<AttrData>,
}

impl NodeData {
    fn root() -> NodeData {
        NodeData {
            name: StrRef::EMPTY,
            data: StrRef::EMPTY,
            parent: None,
            children: SliceRef::empty(),
            attrs: SliceRef::empty(),
        }
    }
}

/// An XML document loaded into a read-only node tree.
///
/// The document owns a memory pool backing every name, text, and
/// attribute in the tree; [Node] views borrow the document and cost
/// nothing to copy or query. A document starts with an empty unnamed
/// root node and is (re)populated with [load()](Document::load) or
/// [load_file()](Document::load_file), which report success as a bool
/// and keep the failure message retrievable via
/// [last_error()](Document::last_error).
///
/// # Examples
///
/// ```
/// use xylem::Document;
///
/// let mut doc = Document::new();
/// assert!(doc.load(&b"<config><net port='8080'/></config>"[..]));
///
/// let net = doc.find("config.net").unwrap();
/// assert_eq!(net.attr_i32("port", 80), 8080);
/// assert_eq!(net.attr("host"), "");
/// ```
pub struct Document {
    pool: Pool,
    nodes: Vec<NodeData>,
    encoding: Encoding,
    error: String,
}

impl Document {
    /// Creates a document holding only a fresh empty root.
    pub fn new() -> Document {
        Document {
            pool: Pool::new(),
            nodes: vec![NodeData::root()],
            encoding: Encoding::Utf8,
            error: String::new(),
        }
    }

    /// Releases the whole tree and pool, leaving a fresh empty root.
    pub fn clear(&mut self) {
        self.pool = Pool::new();
        self.nodes.clear();
        self.nodes.push(NodeData::root());
        self.encoding = Encoding::Utf8;
        self.error.clear();
    }

    /// Loads the file at `path`, replacing any previous content.
    ///
    /// Returns false when opening or parsing fails; the message is then
    /// available via [last_error()](Document::last_error) and the
    /// document holds just its fresh root.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> bool {
        match std::fs::File::open(path.as_ref()) {
            Ok(file) => self.load(file),
            Err(err) => {
                self.clear();
                self.error = format!("unable to read data: {}", err);
                false
            }
        }
    }

    /// Loads a document from any byte source, replacing any previous
    /// content.
    pub fn load<R: Read>(&mut self, source: R) -> bool {
        self.clear();
        match load_tree(source) {
            Ok((pool, nodes, encoding)) => {
                self.pool = pool;
                self.nodes = nodes;
                self.encoding = encoding;
                debug!("loaded document with {} nodes", self.nodes.len() - 1);
                true
            }
            Err(message) => {
                debug!("document load failed: {}", message);
                self.error = message;
                false
            }
        }
    }

    /// The synthetic root node. Top-level elements of the document are
    /// its children.
    pub fn root(&self) -> Node<'_> {
        Node {
            doc: self,
            id: NodeId::ROOT,
        }
    }

    /// Walks a dot-separated path of element names from the root. The
    /// first matching child wins at each level.
    pub fn find(&self, path: &str) -> Option<Node<'_>> {
        self.root().find(path)
    }

    /// The message of the last failed load; empty after a success.
    pub fn last_error(&self) -> &str {
        &self.error
    }

    /// The encoding detected by the last successful load.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Memory usage counters of the backing pool.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn load_tree<R: Read>(source: R) -> Result<(Pool, Vec<NodeData>, Encoding), String> {
    let mut scanner = match Scanner::new(source) {
        Ok(scanner) => scanner,
        Err(err) => return Err(format_error(&err, None)),
    };
    let mut builder = TreeBuilder::new();
    match scanner.parse(&mut builder) {
        Ok(()) => {
            let encoding = scanner.encoding();
            let (pool, nodes) = builder.into_parts();
            Ok((pool, nodes, encoding))
        }
        Err(err) => Err(format_error(&err, Some(scanner.location()))),
    }
}

fn format_error(err: &ScanError, location: Option<Location>) -> String {
    match (err, location) {
        (ScanError::BadXml(_), Some(location)) => format!("{} ({})", err, location),
        _ => err.to_string(),
    }
}

/// A read-only view of one element in a [Document].
///
/// Nodes are cheap copyable handles; every string they return borrows
/// the document's pool directly and stays valid for the document's
/// lifetime.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    fn record(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.index()]
    }

    /// The element name. Empty for the synthetic root.
    pub fn name(&self) -> &'a str {
        // SAFETY: the view points into self.doc's pool.
        unsafe { self.record().name.as_str() }
    }

    /// The character data of the element, with the leading and trailing
    /// whitespace of each text run trimmed. Empty when the element has
    /// no text.
    pub fn data(&self) -> &'a str {
        // SAFETY: the view points into self.doc's pool.
        unsafe { self.record().data.as_str() }
    }

    /// The parent element, None for the root.
    pub fn parent(&self) -> Option<Node<'a>> {
        self.record().parent.map(|id| Node { doc: self.doc, id })
    }

    /// Number of child elements, in document order.
    pub fn child_count(&self) -> usize {
        self.record().children.len
    }

    /// The child element at `index` in document order.
    pub fn child(&self, index: usize) -> Option<Node<'a>> {
        // SAFETY: the view points into self.doc's pool.
        let children = unsafe { self.record().children.as_slice() };
        children.get(index).map(|&id| Node { doc: self.doc, id })
    }

    /// Walks a dot-separated path of element names below this node. The
    /// first matching child wins at each level.
    pub fn find(&self, path: &str) -> Option<Node<'a>> {
        let mut node = *self;
        for part in path.split('.') {
            node = node.children().find(|child| child.name() == part)?;
        }
        Some(node)
    }

    /// Iterates over the child elements in document order.
    pub fn children(&self) -> Children<'a> {
        // SAFETY: the view points into self.doc's pool.
        Children::new(self.doc, unsafe { self.record().children.as_slice() })
    }

    /// Number of attributes on the element.
    pub fn attr_count(&self) -> usize {
        self.record().attrs.len
    }

    /// Whether the named attribute is present.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs().any(|(attr_name, _)| attr_name == name)
    }

    /// The value of the named attribute, empty when absent.
    pub fn attr(&self, name: &str) -> &'a str {
        let mut attrs = self.attrs();
        attrs
            .find(|&(attr_name, _)| attr_name == name)
            .map(|(_, value)| value)
            .unwrap_or("")
    }

    /// The named attribute parsed as a signed 32-bit integer, or the
    /// default when the attribute is absent or not such an integer.
    pub fn attr_i32(&self, name: &str, default: i32) -> i32 {
        parse_i32(self.attr(name)).unwrap_or(default)
    }

    /// The named attribute parsed as a boolean, or the default. Only the
    /// literals `true` and `false` match, case-insensitively.
    pub fn attr_bool(&self, name: &str, default: bool) -> bool {
        let value = self.attr(name);
        if value.eq_ignore_ascii_case("true") {
            true
        } else if value.eq_ignore_ascii_case("false") {
            false
        } else {
            default
        }
    }

    /// Iterates over the (name, value) attribute pairs in document
    /// order.
    pub fn attrs(&self) -> Attrs<'a> {
        // SAFETY: the view points into self.doc's pool.
        Attrs::new(unsafe { self.record().attrs.as_slice() })
    }
}

impl Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node <{}>", self.name())
    }
}

const I32_MAX_DIGITS: &[u8] = b"2147483647";
const I32_MIN_DIGITS: &[u8] = b"2147483648";

// Digit-by-digit parse that rejects anything outside the signed 32-bit
// range by comparing against the literal bounds.
fn parse_i32(s: &str) -> Option<i32> {
    let bytes = s.as_bytes();
    let (negative, digits) = match bytes.split_first()? {
        (b'-', rest) => (true, rest),
        _ => (false, bytes),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let mut first = 0;
    while first + 1 < digits.len() && digits[first] == b'0' {
        first += 1;
    }
    let digits = &digits[first..];
    let bound = if negative { I32_MIN_DIGITS } else { I32_MAX_DIGITS };
    if digits.len() > bound.len() || (digits.len() == bound.len() && digits > bound) {
        return None;
    }
    let mut value: i64 = 0;
    for &b in digits {
        value = value * 10 + i64::from(b - b'0');
    }
    if negative {
        value = -value;
    }
    Some(value as i32)
}

#[cfg(test)]
mod tests;

/// # Must not compile tests
///
/// Node views cannot outlive their Document:
/// ```compile_fail
/// use xylem::Document;
/// let name: &str;
/// {
///     let mut doc = Document::new();
///     doc.load(&b"<a/>"[..]);
///     name = doc.root().child(0).unwrap().name();
/// }
/// println!("{}", name);
/// ```
#[cfg(doctest)]
struct MustNotCompileTests;
