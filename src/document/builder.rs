/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::ScanError;
use crate::ScanEvent;
use crate::ScanHandler;
use crate::pool::Pool;

use super::AttrData;
use super::NodeData;
use super::NodeId;
use super::SliceRef;
use super::StrRef;
use super::error::description;

/// Assembles the node tree from scanner events.
///
/// Nesting is tracked with explicit stacks instead of recursion: a flat
/// stack of sibling node ids plus a stack of frame boundaries marking
/// where each open element's children begin. Attributes and text are
/// buffered transiently and materialized into pool storage when the
/// element closes.
pub(super) struct TreeBuilder {
    pool: Pool,
    nodes: Vec<NodeData>,
    current: NodeId,
    sibling_stack: Vec<NodeId>,
    frame_stack: Vec<usize>,
    text_stack: Vec<String>,
    pending_attrs: Vec<AttrData>,
}

impl TreeBuilder {
    pub(super) fn new() -> TreeBuilder {
        TreeBuilder {
            pool: Pool::new(),
            nodes: vec![NodeData::root()],
            current: NodeId::ROOT,
            sibling_stack: Vec::new(),
            frame_stack: vec![0],
            text_stack: vec![String::new()],
            pending_attrs: Vec::new(),
        }
    }

    pub(super) fn into_parts(self) -> (Pool, Vec<NodeData>) {
        (self.pool, self.nodes)
    }

    fn flush_attrs(&mut self) -> Result<(), ScanError> {
        if self.pending_attrs.is_empty() {
            return Ok(());
        }
        let slice = self.pool.alloc_slice(&self.pending_attrs)?;
        self.nodes[self.current.index()].attrs = SliceRef::new(slice);
        self.pending_attrs.clear();
        Ok(())
    }

    fn open_tag(&mut self, name: &str) -> Result<(), ScanError> {
        if name.is_empty() {
            return Err(ScanError::BadXml(description::UNNAMED_ELEMENT));
        }
        self.flush_attrs()?;
        let name_ref = StrRef::new(self.pool.push_str(name)?);
        let id = NodeId::new(self.nodes.len())?;
        self.nodes.push(NodeData {
            name: name_ref,
            data: StrRef::EMPTY,
            parent: Some(self.current),
            children: SliceRef::empty(),
            attrs: SliceRef::empty(),
        });
        self.sibling_stack.push(id);
        self.frame_stack.push(self.sibling_stack.len());
        self.text_stack.push(String::new());
        self.current = id;
        Ok(())
    }

    fn add_attr(&mut self, name: &str, value: &str) -> Result<(), ScanError> {
        // Elements rarely carry more than a handful of attributes, so a
        // linear compare against the pending set is enough.
        for attr in &self.pending_attrs {
            // SAFETY: the view points into our own pool.
            if unsafe { attr.name.as_str() } == name {
                return Err(ScanError::BadXml(description::DUPLICATE_ATTRIBUTE));
            }
        }
        let name_ref = StrRef::new(self.pool.push_str(name)?);
        let value_ref = StrRef::new(self.pool.push_str(value)?);
        self.pending_attrs.push(AttrData {
            name: name_ref,
            value: value_ref,
        });
        Ok(())
    }

    fn add_text(&mut self, text: &str, is_first: bool) {
        let buf = match self.text_stack.last_mut() {
            Some(buf) => buf,
            None => return,
        };
        if is_first && !buf.is_empty() {
            // A second text run after a comment or child element; keep
            // both, separated by a line break.
            buf.push('\n');
        }
        buf.push_str(text);
    }

    fn close_tag(&mut self, name: &str) -> Result<(), ScanError> {
        if self.current == NodeId::ROOT {
            return Err(ScanError::BadXml(description::UNPAIRED_CLOSE));
        }
        if !name.is_empty() {
            // SAFETY: the view points into our own pool.
            let current_name = unsafe { self.nodes[self.current.index()].name.as_str() };
            if current_name != name {
                return Err(ScanError::BadXml(description::UNPAIRED_CLOSE));
            }
        }
        self.flush_attrs()?;
        if let Some(text) = self.text_stack.pop()
            && !text.is_empty()
        {
            self.nodes[self.current.index()].data = StrRef::new(self.pool.push_str(&text)?);
        }
        if let Some(frame) = self.frame_stack.pop() {
            let children = &self.sibling_stack[frame..];
            if !children.is_empty() {
                self.nodes[self.current.index()].children =
                    SliceRef::new(self.pool.alloc_slice(children)?);
            }
            self.sibling_stack.truncate(frame);
        }
        if let Some(parent) = self.nodes[self.current.index()].parent {
            self.current = parent;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ScanError> {
        if self.current != NodeId::ROOT {
            // Some element was never closed.
            return Err(ScanError::BadXml(description::UNEXPECTED_END));
        }
        let text = &self.text_stack[0];
        if !text.is_empty() {
            let data = StrRef::new(self.pool.push_str(text)?);
            self.nodes[NodeId::ROOT.index()].data = data;
        }
        if !self.sibling_stack.is_empty() {
            let children = SliceRef::new(self.pool.alloc_slice(&self.sibling_stack)?);
            self.nodes[NodeId::ROOT.index()].children = children;
        }
        Ok(())
    }
}

impl ScanHandler for TreeBuilder {
    fn handle_event(&mut self, event: &ScanEvent) -> Result<(), ScanError> {
        match event {
            ScanEvent::DocOpen => Ok(()),
            ScanEvent::DocClose => self.finish(),
            ScanEvent::TagOpen(name) => self.open_tag(name),
            ScanEvent::TagClose(name) => self.close_tag(name),
            ScanEvent::Attr(name, value) => self.add_attr(name, value),
            ScanEvent::Text(text, is_first) => {
                self.add_text(text, *is_first);
                Ok(())
            }
        }
    }
}
