//! Little-endian binary writer for the asset image.
//!
//! Two things make this more than a `Vec<u8>` wrapper. Offsets to records
//! that have not been written yet are reserved as 4-byte slots and patched
//! once the target position is known. And object payloads referenced by
//! offset are queued rather than written inline, so sibling records land
//! contiguously and an array of N children is N fixed-size records a reader
//! can index into.

use crate::diagnostics::BuildError;
use crate::project::StringEncoding;
use std::collections::VecDeque;

/// Handle to a reserved 4-byte offset slot. Must be resolved exactly once
/// before [`DataBuffer::finalize`].
#[derive(Debug)]
pub struct OffsetSlot {
    index: usize,
}

struct Patch {
    at: usize,
    value: Option<u32>,
}

type DeferredWriter<'a> = Box<dyn FnOnce(&mut DataBuffer<'a>) -> Result<(), BuildError> + 'a>;

pub struct DataBuffer<'a> {
    data: Vec<u8>,
    patches: Vec<Patch>,
    deferred: VecDeque<(usize, DeferredWriter<'a>)>,
    string_encoding: StringEncoding,

    // Start of the region currently being written; reserved offsets resolve
    // relative to this, matching what the firmware reader recomputes.
    base: usize,
}

impl<'a> DataBuffer<'a> {
    pub fn new(string_encoding: StringEncoding) -> DataBuffer<'a> {
        DataBuffer {
            data: Vec::with_capacity(64 * 1024),
            patches: Vec::new(),
            deferred: VecDeque::new(),
            string_encoding,
            base: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u8_array(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a string per the configured encoding, then pad to 4 bytes.
    pub fn write_string(&mut self, s: &str) {
        match self.string_encoding {
            StringEncoding::NulTerminated => {
                self.data.extend_from_slice(s.as_bytes());
                self.data.push(0);
            }
            StringEncoding::LengthPrefixed => {
                self.write_u32(s.len() as u32);
                self.data.extend_from_slice(s.as_bytes());
            }
        }
        self.add_padding();
    }

    /// Pad with zero bytes to the next 4-byte boundary.
    pub fn add_padding(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    /// Reserve a 4-byte slot at the current position. The slot holds zero
    /// until [`resolve_offset`](Self::resolve_offset) patches it.
    pub fn reserve_offset(&mut self) -> OffsetSlot {
        let at = self.data.len();
        self.write_u32(0);
        self.patches.push(Patch { at, value: None });
        OffsetSlot {
            index: self.patches.len() - 1,
        }
    }

    /// Patch a reserved slot with the current position, relative to the
    /// start of the current region.
    pub fn resolve_offset(&mut self, slot: OffsetSlot) -> Result<(), BuildError> {
        let offset = (self.data.len() - self.base) as u32;
        self.resolve_offset_to(slot, offset)
    }

    /// Patch a reserved slot with an explicit value.
    pub fn resolve_offset_to(&mut self, slot: OffsetSlot, value: u32) -> Result<(), BuildError> {
        let patch = &mut self.patches[slot.index];
        if patch.value.is_some() {
            return Err(BuildError::validation(
                "internal: offset slot resolved twice",
            ));
        }
        patch.value = Some(value);
        Ok(())
    }

    /// Write an offset to an object whose payload is produced by `writer`.
    /// The payload is queued and written after the current record batch, so
    /// sibling records stay contiguous. An absent object writes offset 0.
    pub fn write_object_offset(
        &mut self,
        writer: Option<impl FnOnce(&mut DataBuffer<'a>) -> Result<(), BuildError> + 'a>,
    ) {
        match writer {
            Some(writer) => {
                let slot = self.reserve_offset();
                self.deferred.push_back((slot.index, Box::new(writer)));
            }
            None => self.write_u32(0),
        }
    }

    /// Write a `u32` count followed by an offset to N contiguous records,
    /// one `writer` call per item.
    pub fn write_array<T>(
        &mut self,
        items: &'a [T],
        writer: impl Fn(&mut DataBuffer<'a>, &'a T) -> Result<(), BuildError> + Copy + 'a,
    ) {
        self.write_u32(items.len() as u32);
        if items.is_empty() {
            self.write_u32(0);
            return;
        }
        self.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
            for item in items {
                writer(buffer, item)?;
            }
            Ok(())
        }));
    }

    /// Write an offset to a string payload.
    pub fn write_string_offset(&mut self, s: &'a str) {
        self.write_object_offset(Some(move |buffer: &mut DataBuffer<'a>| {
            buffer.write_string(s);
            Ok(())
        }));
    }

    /// Drain the deferred-writer queue in FIFO order. Writers may queue
    /// further writers; those run in the same pass, which is what keeps each
    /// generation of child records contiguous.
    fn flush_deferred(&mut self) -> Result<(), BuildError> {
        while let Some((slot_index, writer)) = self.deferred.pop_front() {
            self.add_padding();
            let offset = (self.data.len() - self.base) as u32;
            let patch = &mut self.patches[slot_index];
            if patch.value.is_some() {
                return Err(BuildError::validation(
                    "internal: offset slot resolved twice",
                ));
            }
            patch.value = Some(offset);
            writer(self)?;
        }
        Ok(())
    }

    /// Write a region table followed by the regions themselves.
    ///
    /// `count` u32 slots come first, one offset per region relative to the
    /// start of the table, each patched as its region is written. Regions
    /// start 4-byte aligned and offsets inside one are region-relative.
    /// Tables nest: a region is free to open its own sub-table.
    pub fn write_regions(
        &mut self,
        count: usize,
        mut region: impl FnMut(&mut DataBuffer<'a>, usize) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let table_start = self.data.len();
        let saved_base = self.base;

        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            slots.push(self.reserve_offset());
        }

        for (i, slot) in slots.into_iter().enumerate() {
            self.add_padding();
            self.base = self.data.len();
            let offset = (self.base - table_start) as u32;
            self.resolve_offset_to(slot, offset)?;
            region(self, i)?;
            self.flush_deferred()?;
        }

        self.add_padding();
        self.base = saved_base;
        Ok(())
    }

    /// Apply all patches and return the finished image. Fails if any
    /// reserved slot was never resolved.
    pub fn finalize(mut self) -> Result<Vec<u8>, BuildError> {
        self.flush_deferred()?;
        self.add_padding();

        for patch in &self.patches {
            let value = patch.value.ok_or_else(|| {
                BuildError::validation("internal: unresolved offset slot in image")
            })?;
            self.data[patch.at..patch.at + 4].copy_from_slice(&value.to_le_bytes());
        }

        Ok(self.data)
    }
}

#[cfg(test)]
mod data_buffer_tests {
    use super::*;

    fn buffer<'a>() -> DataBuffer<'a> {
        DataBuffer::new(StringEncoding::NulTerminated)
    }

    #[test]
    fn scalars_are_little_endian() {
        let mut b = buffer();
        b.write_u16(0x1234);
        b.write_u32(0xAABBCCDD);
        let data = b.finalize().unwrap();
        assert_eq!(data[..2], [0x34, 0x12]);
        assert_eq!(data[2..6], [0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn strings_are_nul_terminated_and_padded() {
        let mut b = buffer();
        b.write_string("abc");
        let data = b.finalize().unwrap();
        // "abc" + NUL is already 4-aligned
        assert_eq!(data, b"abc\0");

        let mut b = buffer();
        b.write_string("abcd");
        let data = b.finalize().unwrap();
        assert_eq!(data, b"abcd\0\0\0\0");
    }

    #[test]
    fn length_prefixed_strings() {
        let mut b = DataBuffer::new(StringEncoding::LengthPrefixed);
        b.write_string("hi");
        let data = b.finalize().unwrap();
        assert_eq!(data[..4], [2, 0, 0, 0]);
        assert_eq!(&data[4..6], b"hi");
        assert_eq!(data.len(), 8);
    }

    #[test]
    fn array_items_are_contiguous() {
        let items = [1u32, 2, 3];
        let mut b = buffer();
        b.write_regions(1, |b, _| {
            b.write_array(&items, |b, item| {
                b.write_u32(*item);
                // nested payload per item; must not break record contiguity
                b.write_object_offset(Some(move |b: &mut DataBuffer| {
                    b.write_u32(item * 10);
                    Ok(())
                }));
                Ok(())
            });
            Ok(())
        })
        .unwrap();
        let data = b.finalize().unwrap();

        // region table: one entry pointing just past itself
        let region_start = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        assert_eq!(region_start, 4);

        let count = u32::from_le_bytes(data[4..8].try_into().unwrap());
        assert_eq!(count, 3);

        let records =
            u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize + region_start;
        // three 8-byte records back to back
        for (i, item) in items.iter().enumerate() {
            let at = records + i * 8;
            let value = u32::from_le_bytes(data[at..at + 4].try_into().unwrap());
            assert_eq!(value, *item);

            let payload = u32::from_le_bytes(data[at + 4..at + 8].try_into().unwrap()) as usize
                + region_start;
            let payload_value =
                u32::from_le_bytes(data[payload..payload + 4].try_into().unwrap());
            assert_eq!(payload_value, item * 10);
        }
    }

    #[test]
    fn empty_array_writes_zero_offset() {
        let items: [u32; 0] = [];
        let mut b = buffer();
        b.write_array(&items, |b, item| {
            b.write_u32(*item);
            Ok(())
        });
        let data = b.finalize().unwrap();
        assert_eq!(data, [0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn unresolved_slot_fails_finalize() {
        let mut b = buffer();
        let _slot = b.reserve_offset();
        assert!(b.finalize().is_err());
    }

    #[test]
    fn double_resolve_is_rejected() {
        let mut b = buffer();
        let slot = b.reserve_offset();
        b.resolve_offset_to(slot, 8).unwrap();
        let slot2 = OffsetSlot { index: 0 };
        assert!(b.resolve_offset_to(slot2, 12).is_err());
    }

    #[test]
    fn regions_start_aligned() {
        let mut b = buffer();
        b.write_regions(2, |b, i| {
            if i == 0 {
                b.write_u8(7);
            } else {
                b.write_u32(9);
            }
            Ok(())
        })
        .unwrap();
        let data = b.finalize().unwrap();

        let r0 = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let r1 = u32::from_le_bytes(data[4..8].try_into().unwrap());
        assert_eq!(r0 % 4, 0);
        assert_eq!(r1 % 4, 0);
        assert!(r1 > r0);
    }
}
