/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::AttrData;
use super::Document;
use super::Node;
use super::NodeId;

/// Iterator over the child elements of a [Node], in document order.
pub struct Children<'a> {
    doc: &'a Document,
    ids: &'a [NodeId],
    index: usize,
}

impl<'a> Children<'a> {
    pub(super) fn new(doc: &'a Document, ids: &'a [NodeId]) -> Children<'a> {
        Children {
            doc,
            ids,
            index: 0,
        }
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.ids.get(self.index)?;
        self.index += 1;
        Some(Node { doc: self.doc, id })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.ids.len() - self.index;
        (left, Some(left))
    }
}

/// Iterator over the (name, value) attribute pairs of a [Node], in
/// document order.
pub struct Attrs<'a> {
    attrs: &'a [AttrData],
    index: usize,
}

impl<'a> Attrs<'a> {
    pub(super) fn new(attrs: &'a [AttrData]) -> Attrs<'a> {
        Attrs { attrs, index: 0 }
    }
}

impl<'a> Iterator for Attrs<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let attr = self.attrs.get(self.index)?;
        self.index += 1;
        // SAFETY: the views point into the pool of the Document that 'a
        // borrows.
        unsafe { Some((attr.name.as_str(), attr.value.as_str())) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.attrs.len() - self.index;
        (left, Some(left))
    }
}
