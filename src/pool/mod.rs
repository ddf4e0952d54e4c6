/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;

use std::alloc::{Layout, alloc, dealloc};
use std::cell::UnsafeCell;
use std::marker::PhantomPinned;
use std::ptr::null_mut;

pub use error::AllocError;

/// Size of a standard block's data area in bytes.
const BLOCK_BYTES: usize = 4096;

/// Requests below this size open a fresh standard block when the current
/// one is full; anything larger gets a dedicated block of its own.
const SMALL_LIMIT: usize = BLOCK_BYTES / 16;

/// A memory pool for the document tree storage.
///
/// The pool hands out memory from a singly linked list of heap blocks
/// with a simple bump cursor. A returned reference is never moved or
/// invalidated until the whole pool is dropped, which is what allows the
/// document nodes to keep borrowed views of their names, text, and
/// attribute arrays without any copying during queries.
///
/// All memory is released at once when the pool is dropped.
pub struct Pool {
    state: UnsafeCell<PoolState>,
}

struct PoolState {
    // Most recent standard block; bump allocations are served from here.
    current: *mut Block,
    // Head of the list of every block, for release.
    blocks: *mut Block,
}

struct Block {
    next: *mut Block,
    size: usize,
    used: usize,
    mem: *mut u8,
    alloc_layout: Layout,

    // Pool and other Blocks keep raw pointers to this struct
    _pin: PhantomPinned,
}

impl Block {
    fn create(size: usize) -> Result<*mut Block, AllocError> {
        let data_layout = Layout::array::<u8>(size)?;
        let (block_layout, data_offset) = Layout::new::<Block>().extend(data_layout)?;
        let block_layout = block_layout.pad_to_align();

        unsafe {
            let ptr = alloc(block_layout);
            if ptr.is_null() {
                return Err(AllocError);
            }
            let block = ptr as *mut Block;
            (*block).next = null_mut();
            (*block).size = size;
            (*block).used = 0;
            (*block).mem = ptr.byte_add(data_offset);
            (*block).alloc_layout = block_layout;

            Ok(block)
        }
    }

    fn pad_to(&self, align: usize) -> usize {
        let addr = self.mem as usize + self.used;
        self.used + (addr.wrapping_neg() & (align - 1))
    }

    fn fits(&self, layout: Layout) -> bool {
        self.pad_to(layout.align()) + layout.size() <= self.size
    }

    fn take(&mut self, layout: Layout) -> *mut u8 {
        let start = self.pad_to(layout.align());
        debug_assert!(start + layout.size() <= self.size);
        self.used = start + layout.size();
        unsafe { self.mem.byte_add(start) }
    }
}

impl Pool {
    /// Creates a new empty pool. The first block is allocated on demand.
    pub fn new() -> Pool {
        Pool {
            state: UnsafeCell::new(PoolState {
                current: null_mut(),
                blocks: null_mut(),
            }),
        }
    }

    fn alloc(&self, layout: Layout) -> Result<*mut u8, AllocError> {
        // Block data starts at pointer alignment; nothing in the tree
        // storage needs more.
        debug_assert!(layout.align() <= align_of::<Block>());

        let state = unsafe { &mut *self.state.get() };
        unsafe {
            if !state.current.is_null() && (*state.current).fits(layout) {
                return Ok((*state.current).take(layout));
            }
            if layout.size() < SMALL_LIMIT {
                let block = Block::create(BLOCK_BYTES)?;
                (*block).next = state.blocks;
                state.blocks = block;
                state.current = block;
                Ok((*block).take(layout))
            } else {
                // Oversized request: a block sized exactly to it, leaving
                // the current standard block for further small requests.
                let block = Block::create(layout.size())?;
                (*block).next = state.blocks;
                state.blocks = block;
                Ok((*block).take(layout))
            }
        }
    }

    /// Copies a string into pool memory and returns the pool-owned view.
    pub fn push_str<'a>(&'a self, s: &str) -> Result<&'a str, AllocError> {
        if s.is_empty() {
            return Ok("");
        }
        let ptr = self.alloc(Layout::array::<u8>(s.len())?)?;
        unsafe {
            std::ptr::copy_nonoverlapping(s.as_ptr(), ptr, s.len());
            let slice = std::slice::from_raw_parts(ptr, s.len());

            Ok(std::str::from_utf8_unchecked(slice))
        }
    }

    /// Copies a slice of trivially copyable elements into one contiguous
    /// pool allocation and returns the pool-owned view.
    ///
    /// An element count whose byte size would overflow the address space
    /// is rejected with [AllocError], never truncated.
    pub fn alloc_slice<'a, T: Copy>(&'a self, items: &[T]) -> Result<&'a [T], AllocError> {
        if items.is_empty() {
            return Ok(&[]);
        }
        let layout = Layout::array::<T>(items.len())?;
        let ptr = self.alloc(layout)? as *mut T;
        unsafe {
            std::ptr::copy_nonoverlapping(items.as_ptr(), ptr, items.len());

            Ok(std::slice::from_raw_parts(ptr, items.len()))
        }
    }

    /// Returns the block and byte usage counters of the pool.
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            nr_blocks: 0,
            allocated_bytes: 0,
            used_bytes: 0,
        };
        unsafe {
            let state = &*self.state.get();
            let mut block = state.blocks;
            while !block.is_null() {
                stats.nr_blocks += 1;
                stats.allocated_bytes += (*block).alloc_layout.size();
                stats.used_bytes += (*block).used;
                block = (*block).next;
            }
        }
        stats
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        unsafe {
            let state = &mut *self.state.get_mut();
            let mut block = state.blocks;
            while !block.is_null() {
                let next = (*block).next;
                dealloc(block as *mut u8, (*block).alloc_layout);
                block = next;
            }
        }
    }
}

/// Memory usage counters of a [Pool].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolStats {
    /// Number of heap blocks owned by the pool.
    pub nr_blocks: u32,
    /// Total heap bytes held, including block headers.
    pub allocated_bytes: usize,
    /// Data bytes handed out from the blocks.
    pub used_bytes: usize,
}


/// # Must not compile tests
///
/// Returned &str cannot outlive the pool:
/// ```compile_fail
/// use xylem::Pool;
/// let s: &str;
/// {
///     let pool = Pool::new();
///     s = pool.push_str("will dangle").unwrap();
/// }
/// println!("{}", s);
/// ```
#[cfg(doctest)]
struct MustNotCompileTests;
