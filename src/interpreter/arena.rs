//! Simulated heap for the dynamic allocation opcodes.
//!
//! Addresses handed to programs are byte offsets into the arena buffer, never
//! host pointers. Every load and store is checked against the allocation table,
//! so a bad address is reported as [`VmError::InvalidAddress`] instead of
//! touching memory the program does not own.
//!
//! # Layout
//!
//! - Offsets `0..FIRST_ADDRESS` are never allocated, so `0` stays a null address
//! - Allocations start on [`ALIGNMENT`] boundaries and are placed first-fit
//! - New regions are zero-filled
//! - A zero-size request reserves one slot so it still gets a unique address,
//!   but its usable length is zero and every access into it fails

use crate::interpreter::errors::{VmError, VmResult};
use crate::interpreter::isa::{Address, Byte, WORD_SIZE, Word};
use std::collections::BTreeMap;

/// Lowest offset the arena hands out.
pub const FIRST_ADDRESS: usize = 8;
/// Every allocation start is a multiple of this.
pub const ALIGNMENT: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Allocation {
    /// Bytes the program may access.
    len: usize,
    /// Bytes held in the buffer, `len` rounded up to [`ALIGNMENT`] (at least one slot).
    reserved: usize,
}

/// Byte buffer plus the table of live allocations, keyed by start offset.
#[derive(Clone, Debug)]
pub struct Arena {
    memory: Vec<Byte>,
    allocations: BTreeMap<usize, Allocation>,
}

fn align_up(value: usize) -> Option<usize> {
    value
        .checked_add(ALIGNMENT - 1)
        .map(|v| v & !(ALIGNMENT - 1))
}

fn reservation(size: usize) -> Option<usize> {
    align_up(size.max(1))
}

impl Arena {
    /// Creates an arena of `capacity` bytes, clamped to the addressable range.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Address::MAX as usize);
        Self {
            memory: vec![0; capacity],
            allocations: BTreeMap::new(),
        }
    }

    /// Total size of the buffer in bytes, including the unusable prefix.
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Number of regions currently allocated.
    pub fn live_allocations(&self) -> usize {
        self.allocations.len()
    }

    /// Sum of the requested sizes of all live regions.
    pub fn bytes_in_use(&self) -> usize {
        self.allocations.values().map(|a| a.len).sum()
    }

    /// Usable length of the region starting at `address`, if it is live.
    pub fn allocation_len(&self, address: Address) -> Option<usize> {
        self.allocations.get(&(address as usize)).map(|a| a.len)
    }

    /// Size of the largest contiguous free block.
    pub fn largest_free_block(&self) -> usize {
        let mut largest = 0;
        let mut cursor = FIRST_ADDRESS;
        for (&start, alloc) in &self.allocations {
            largest = largest.max(start.saturating_sub(cursor));
            cursor = start + alloc.reserved;
        }
        largest.max(self.memory.len().saturating_sub(cursor))
    }

    /// First aligned offset with `reserved` free bytes.
    fn find_gap(&self, reserved: usize) -> Option<usize> {
        let mut cursor = FIRST_ADDRESS;
        for (&start, alloc) in &self.allocations {
            if start.saturating_sub(cursor) >= reserved {
                return Some(cursor);
            }
            cursor = start + alloc.reserved;
        }
        (self.memory.len().saturating_sub(cursor) >= reserved).then_some(cursor)
    }

    fn out_of_memory(&self, requested: usize) -> VmError {
        VmError::OutOfMemory {
            requested,
            available: self.largest_free_block(),
        }
    }

    /// Allocates `size` zero-filled bytes and returns their address.
    pub fn allocate(&mut self, size: usize) -> VmResult<Address> {
        let reserved = reservation(size).ok_or_else(|| self.out_of_memory(size))?;
        let start = self
            .find_gap(reserved)
            .ok_or_else(|| self.out_of_memory(size))?;
        self.memory[start..start + reserved].fill(0);
        self.allocations.insert(
            start,
            Allocation {
                len: size,
                reserved,
            },
        );
        Ok(start as Address)
    }

    /// Allocates `count` elements of `size` bytes each, zero-filled.
    pub fn allocate_zeroed(&mut self, count: usize, size: usize) -> VmResult<Address> {
        let total = count
            .checked_mul(size)
            .ok_or_else(|| self.out_of_memory(count.saturating_mul(size)))?;
        self.allocate(total)
    }

    /// Changes the size of the region at `address`, returning its (possibly new) address.
    ///
    /// Address 0 allocates. The region grows in place when the following gap
    /// allows, otherwise it moves. On failure the original region is untouched.
    pub fn resize(&mut self, address: Address, size: usize) -> VmResult<Address> {
        if address == 0 {
            return self.allocate(size);
        }
        let start = address as usize;
        let Some(&current) = self.allocations.get(&start) else {
            return Err(VmError::InvalidFree { address });
        };
        let reserved = reservation(size).ok_or_else(|| self.out_of_memory(size))?;

        let limit = self
            .allocations
            .range(start + 1..)
            .next()
            .map_or(self.memory.len(), |(&next, _)| next);
        if limit - start >= reserved {
            if size > current.len {
                self.memory[start + current.len..start + size].fill(0);
            }
            let grown = Allocation {
                len: size,
                reserved,
            };
            self.allocations.insert(start, grown);
            return Ok(address);
        }

        let moved = self.allocate(size)? as usize;
        let keep = current.len.min(size);
        self.memory.copy_within(start..start + keep, moved);
        self.allocations.remove(&start);
        Ok(moved as Address)
    }

    /// Releases the region at `address`. Freeing address 0 does nothing.
    pub fn free(&mut self, address: Address) -> VmResult {
        if address == 0 {
            return Ok(());
        }
        self.allocations
            .remove(&(address as usize))
            .map(|_| ())
            .ok_or(VmError::InvalidFree { address })
    }

    /// Buffer offset of a `width`-byte access, if it lies inside one live region.
    fn checked_offset(&self, address: Address, width: usize) -> VmResult<usize> {
        let offset = address as usize;
        let region = self.allocations.range(..=offset).next_back();
        let inside = match (region, offset.checked_add(width)) {
            (Some((&start, alloc)), Some(end)) => end <= start + alloc.len,
            _ => false,
        };
        if inside {
            Ok(offset)
        } else {
            Err(VmError::InvalidAddress { address, width })
        }
    }

    pub fn load_byte(&self, address: Address) -> VmResult<Byte> {
        let offset = self.checked_offset(address, 1)?;
        Ok(self.memory[offset])
    }

    pub fn store_byte(&mut self, address: Address, value: Byte) -> VmResult {
        let offset = self.checked_offset(address, 1)?;
        self.memory[offset] = value;
        Ok(())
    }

    /// Reads a little-endian word.
    pub fn load_word(&self, address: Address) -> VmResult<Word> {
        let offset = self.checked_offset(address, WORD_SIZE)?;
        let mut bytes = [0u8; WORD_SIZE];
        bytes.copy_from_slice(&self.memory[offset..offset + WORD_SIZE]);
        Ok(Word::from_le_bytes(bytes))
    }

    /// Writes a little-endian word.
    pub fn store_word(&mut self, address: Address, value: Word) -> VmResult {
        let offset = self.checked_offset(address, WORD_SIZE)?;
        self.memory[offset..offset + WORD_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}
