/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;

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

fn load(xml: &str) -> Document {
    let mut doc = Document::new();
    assert!(doc.load(xml.as_bytes()), "load failed: {}", doc.last_error());
    doc
}

fn signature(node: Node, out: &mut String) {
    out.push('<');
    out.push_str(node.name());
    for (name, value) in node.attrs() {
        out.push(' ');
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out.push('>');
    out.push_str(node.data());
    for child in node.children() {
        signature(child, out);
    }
    out.push_str("</>");
}

fn doc_signature(doc: &Document) -> String {
    let mut out = String::new();
    signature(doc.root(), &mut out);
    out
}

#[test]
fn basic_tree() {
    let doc = load("<a x=\"1\"><b>Hello</b></a>");

    let root = doc.root();
    assert_eq!(root.name(), "");
    assert_eq!(root.child_count(), 1);
    assert!(root.parent().is_none());

    let a = root.child(0).unwrap();
    assert_eq!(a.name(), "a");
    assert_eq!(a.attr_count(), 1);
    assert!(a.has_attr("x"));
    assert_eq!(a.attr("x"), "1");
    assert_eq!(a.attr_i32("x", 0), 1);
    // "1" is neither true nor false, so the default wins.
    assert!(a.attr_bool("x", true));
    assert!(!a.attr_bool("x", false));
    assert_eq!(a.parent().unwrap().name(), "");

    let b = a.child(0).unwrap();
    assert_eq!(b.name(), "b");
    assert_eq!(b.data(), "Hello");
    assert_eq!(b.child_count(), 0);
    assert_eq!(b.attr_count(), 0);
    assert_eq!(b.parent().unwrap().name(), "a");
    assert!(a.child(1).is_none());
}

#[test]
fn bom_prefixed_document() {
    let mut doc = Document::new();
    assert!(doc.load(&b"\xef\xbb\xbf<r/>"[..]));
    assert_eq!(doc.encoding(), Encoding::Utf8);
    assert_eq!(doc.last_error(), "");

    let r = doc.root().child(0).unwrap();
    assert_eq!(r.name(), "r");
    assert_eq!(r.child_count(), 0);
    assert_eq!(r.attr_count(), 0);
    assert_eq!(r.data(), "");
}

#[test]
fn comments_leave_no_trace() {
    let doc = load("<r><!-- c --><b/></r>");
    let r = doc.root().child(0).unwrap();
    assert_eq!(r.child_count(), 1);
    assert_eq!(r.child(0).unwrap().name(), "b");
    assert_eq!(r.data(), "");
}

#[test]
fn unpaired_closing_tag_fails() {
    let mut doc = Document::new();
    assert!(!doc.load(&b"<r><b></a></r>"[..]));
    assert!(!doc.last_error().is_empty());
    assert!(doc.last_error().contains("unpaired closing tag"));
    // The failed document holds just its fresh root.
    assert_eq!(doc.root().child_count(), 0);
}

#[test]
fn duplicate_attribute_fails() {
    let mut doc = Document::new();
    assert!(!doc.load(&b"<r a=\"1\" a=\"2\"/>"[..]));
    assert!(doc.last_error().contains("duplicated attribute"));
}

#[test]
fn fragments_coalesce_across_reads() {
    let mut doc = Document::new();
    assert!(doc.load(ChunkedSource::new(b"<r>abcdefgh</r>", 4)));
    let r = doc.root().child(0).unwrap();
    assert_eq!(r.data(), "abcdefgh");
}

#[test]
fn i32_boundaries() {
    let doc = load(
        "<n a='2147483647' b='-2147483648' c='2147483648' d='-2147483649' \
         e='12x' f='007' g='' h='-' i='99999999999999999999'/>",
    );
    let n = doc.root().child(0).unwrap();
    assert_eq!(n.attr_i32("a", 0), 2147483647);
    assert_eq!(n.attr_i32("b", 0), -2147483648);
    assert_eq!(n.attr_i32("c", -5), -5);
    assert_eq!(n.attr_i32("d", -5), -5);
    assert_eq!(n.attr_i32("e", 3), 3);
    assert_eq!(n.attr_i32("f", 0), 7);
    assert_eq!(n.attr_i32("g", 9), 9);
    assert_eq!(n.attr_i32("h", 9), 9);
    assert_eq!(n.attr_i32("i", 1), 1);
    // Absent attribute falls back too.
    assert_eq!(n.attr_i32("zz", 42), 42);
}

#[test]
fn bool_literals() {
    let doc = load("<n a='true' b='FALSE' c='True' d='1' e='yes'/>");
    let n = doc.root().child(0).unwrap();
    assert!(n.attr_bool("a", false));
    assert!(!n.attr_bool("b", true));
    assert!(n.attr_bool("c", false));
    assert!(n.attr_bool("d", true));
    assert!(!n.attr_bool("d", false));
    assert!(!n.attr_bool("e", false));
    assert!(n.attr_bool("zz", true));
}

#[test]
fn dotted_paths() {
    let doc = load(
        "<config><net host='local' port='8080'><proxy addr='10.0.0.1'/></net>\
         <net host='backup'/></config>",
    );
    assert_eq!(doc.find("config.net").unwrap().attr("host"), "local");
    assert_eq!(
        doc.find("config.net.proxy").unwrap().attr("addr"),
        "10.0.0.1"
    );
    assert!(doc.find("config.missing").is_none());
    assert!(doc.find("net").is_none());

    let config = doc.find("config").unwrap();
    assert_eq!(config.find("net.proxy").unwrap().attr("addr"), "10.0.0.1");
    assert_eq!(config.child_count(), 2);
    assert_eq!(config.child(1).unwrap().attr("host"), "backup");
}

#[test]
fn text_runs_join_with_newline() {
    let doc = load("<r>a<b/>c</r>");
    let r = doc.root().child(0).unwrap();
    assert_eq!(r.data(), "a\nc");
    assert_eq!(r.child_count(), 1);

    let doc = load("<r>a<!-- x -->b</r>");
    assert_eq!(doc.root().child(0).unwrap().data(), "a\nb");
}

#[test]
fn text_is_trimmed() {
    let doc = load("<r>  hello there \n</r>");
    assert_eq!(doc.root().child(0).unwrap().data(), "hello there");
}

#[test]
fn determinism() {
    let xml = "<a x='1' y='2'><b>text</b><c/><d><e i='3'/></d>tail</a>";
    let first = doc_signature(&load(xml));
    let second = doc_signature(&load(xml));
    assert_eq!(first, second);
}

#[test]
fn chunk_size_independence() {
    let xml = "<cfg name='демо'>\n  <item v='1'>один два  три</item>\n  <item v='2'/>\n</cfg>";
    let whole = doc_signature(&load(xml));
    for chunk in [1, 2, 4, 4096] {
        let mut doc = Document::new();
        assert!(doc.load(ChunkedSource::new(xml.as_bytes(), chunk)));
        assert_eq!(doc_signature(&doc), whole, "chunk size {}", chunk);
    }
}

#[test]
fn malformed_utf8_replaced_in_place() {
    let mut doc = Document::new();
    assert!(doc.load(&b"<r>a\x80b</r>"[..]));
    assert_eq!(doc.root().child(0).unwrap().data(), "a\u{fffd}b");
}

#[test]
fn utf16_document() {
    let mut bytes = vec![0xff, 0xfe];
    for unit in "<r a='5'>текст</r>".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let mut doc = Document::new();
    assert!(doc.load(bytes.as_slice()), "{}", doc.last_error());
    assert_eq!(doc.encoding(), Encoding::Utf16Le);
    let r = doc.root().child(0).unwrap();
    assert_eq!(r.attr_i32("a", 0), 5);
    assert_eq!(r.data(), "текст");
}

#[test]
fn unnamed_element_fails() {
    let mut doc = Document::new();
    assert!(!doc.load(&b"<r><></></r>"[..]));
    assert!(doc.last_error().contains("element without a name"));
}

#[test]
fn unclosed_element_fails() {
    let mut doc = Document::new();
    assert!(!doc.load(&b"<r><b>"[..]));
    assert!(doc.last_error().contains("unexpected end of data"));
}

#[test]
fn unrecognized_encoding_fails() {
    let mut doc = Document::new();
    assert!(!doc.load(&b"garbage"[..]));
    assert!(!doc.last_error().is_empty());
    assert!(!doc.load(&b""[..]));
    assert!(!doc.last_error().is_empty());
}

#[test]
fn error_message_carries_location() {
    let mut doc = Document::new();
    assert!(!doc.load(&b"<r>\n  <!bad/>\n</r>"[..]));
    assert!(doc.last_error().contains("line: 1"));
}

#[test]
fn reload_reuses_document() {
    let mut doc = Document::new();
    assert!(doc.load(&b"<a><b/></a>"[..]));
    assert_eq!(doc.root().child_count(), 1);

    assert!(!doc.load(&b"<a><b></c></a>"[..]));
    assert_eq!(doc.root().child_count(), 0);
    assert!(!doc.last_error().is_empty());

    assert!(doc.load(&b"<d/>"[..]));
    assert_eq!(doc.last_error(), "");
    assert_eq!(doc.root().child(0).unwrap().name(), "d");
}

#[test]
fn clear_resets() {
    let mut doc = Document::new();
    assert!(doc.load(&b"<a><b/></a>"[..]));
    doc.clear();
    assert_eq!(doc.root().child_count(), 0);
    assert_eq!(doc.last_error(), "");
}

#[test]
fn attrs_iterate_in_document_order() {
    let doc = load("<n a='1' b='2' c='3'/>");
    let n = doc.root().child(0).unwrap();
    let pairs: Vec<(&str, &str)> = n.attrs().collect();
    assert_eq!(pairs, [("a", "1"), ("b", "2"), ("c", "3")]);
    assert_eq!(n.attrs().count(), 3);
}

#[test]
fn pool_grows_with_content() {
    let doc = load("<a><b huge='x'/></a>");
    let stats = doc.pool_stats();
    assert!(stats.nr_blocks >= 1);
    assert!(stats.used_bytes > 0);
}

#[test]
fn load_file_missing_path() {
    let mut doc = Document::new();
    assert!(!doc.load_file("/nonexistent/path/to/config.xml"));
    assert!(doc.last_error().contains("unable to read data"));
}

#[test]
fn load_file_roundtrip() {
    let path = std::env::temp_dir().join("xylem_load_file_test.xml");
    std::fs::write(&path, b"<cfg><item v='7'/></cfg>").unwrap();
    let mut doc = Document::new();
    assert!(doc.load_file(&path), "{}", doc.last_error());
    assert_eq!(doc.find("cfg.item").unwrap().attr_i32("v", 0), 7);
    std::fs::remove_file(&path).ok();
}
