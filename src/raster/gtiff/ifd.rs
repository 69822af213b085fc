//! Image File Directory structures
//!
//! Entries keep their raw value bytes together with the byte order they
//! were read in, so values are decoded on demand by tag type.

use std::io::{Cursor, Read, Seek, SeekFrom};

use log::trace;

use crate::errors::{GeorefError, GeorefResult};
use super::byte_order::ByteOrder;
use super::constants::field_types;

/// One tag of an IFD
#[derive(Debug, Clone, PartialEq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    /// Value bytes in `byte_order`
    pub data: Vec<u8>,
    pub byte_order: ByteOrder,
}

impl IfdEntry {
    /// Entry of SHORT values
    pub fn shorts(tag: u16, values: &[u16]) -> Self {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::little_endian(tag, field_types::SHORT, values.len() as u64, data)
    }

    /// Entry of LONG values
    pub fn longs(tag: u16, values: &[u32]) -> Self {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::little_endian(tag, field_types::LONG, values.len() as u64, data)
    }

    /// Entry of DOUBLE values
    pub fn doubles(tag: u16, values: &[f64]) -> Self {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::little_endian(tag, field_types::DOUBLE, values.len() as u64, data)
    }

    /// NUL-terminated ASCII entry
    pub fn ascii(tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        let count = data.len() as u64;
        Self::little_endian(tag, field_types::ASCII, count, data)
    }

    fn little_endian(tag: u16, field_type: u16, count: u64, data: Vec<u8>) -> Self {
        IfdEntry { tag, field_type, count, data, byte_order: ByteOrder::LittleEndian }
    }

    /// Size of the value bytes
    pub fn value_size(&self) -> usize {
        field_types::size(self.field_type) * self.count as usize
    }

    /// Whether the value fits in the entry itself
    pub fn is_inline(&self, is_big_tiff: bool) -> bool {
        self.value_size() <= if is_big_tiff { 8 } else { 4 }
    }

    /// Values of integer types widened to u64
    pub fn values_u64(&self) -> GeorefResult<Vec<u64>> {
        let order = self.byte_order;
        let mut cursor = Cursor::new(self.data.as_slice());
        (0..self.count)
            .map(|_| {
                let value = match self.field_type {
                    field_types::BYTE | field_types::UNDEFINED => {
                        let mut byte = [0u8; 1];
                        cursor.read_exact(&mut byte)?;
                        byte[0] as u64
                    }
                    field_types::SHORT => order.read_u16(&mut cursor)? as u64,
                    field_types::LONG => order.read_u32(&mut cursor)? as u64,
                    field_types::LONG8 | field_types::IFD8 => order.read_u64(&mut cursor)?,
                    other => return Err(GeorefError::Raster(format!(
                        "Tag {} has non-integer type {}", self.tag, other))),
                };
                Ok(value)
            })
            .collect()
    }

    /// First integer value
    pub fn first_u64(&self) -> GeorefResult<u64> {
        self.values_u64()?.first().copied()
            .ok_or_else(|| GeorefError::Raster(format!("Tag {} has no value", self.tag)))
    }

    /// Values of numeric types as f64
    pub fn values_f64(&self) -> GeorefResult<Vec<f64>> {
        let order = self.byte_order;
        match self.field_type {
            field_types::DOUBLE => {
                let mut cursor = Cursor::new(self.data.as_slice());
                (0..self.count).map(|_| Ok(order.read_f64(&mut cursor)?)).collect()
            }
            field_types::FLOAT => {
                let mut cursor = Cursor::new(self.data.as_slice());
                (0..self.count).map(|_| Ok(order.read_f32(&mut cursor)? as f64)).collect()
            }
            _ => Ok(self.values_u64()?.into_iter().map(|v| v as f64).collect()),
        }
    }

    /// ASCII value without the trailing NUL
    pub fn text(&self) -> String {
        let end = self.data.iter().rposition(|&b| b != 0).map(|p| p + 1).unwrap_or(0);
        String::from_utf8_lossy(&self.data[..end]).into_owned()
    }
}

/// An Image File Directory
#[derive(Debug, Clone, Default)]
pub struct Ifd {
    pub entries: Vec<IfdEntry>,
}

impl Ifd {
    /// Read the IFD at `offset`, loading every value
    pub fn read<R: Read + Seek>(reader: &mut R, order: ByteOrder, offset: u64, is_big_tiff: bool) -> GeorefResult<Ifd> {
        reader.seek(SeekFrom::Start(offset))?;
        let entry_count = if is_big_tiff {
            order.read_u64(reader)?
        } else {
            order.read_u16(reader)? as u64
        };

        let mut raw = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let tag = order.read_u16(reader)?;
            let field_type = order.read_u16(reader)?;
            let count = if is_big_tiff { order.read_u64(reader)? } else { order.read_u32(reader)? as u64 };
            let mut value = vec![0u8; if is_big_tiff { 8 } else { 4 }];
            reader.read_exact(&mut value)?;
            raw.push((tag, field_type, count, value));
        }

        let mut ifd = Ifd::default();
        for (tag, field_type, count, value) in raw {
            let size = field_types::size(field_type) * count as usize;
            let data = if size <= value.len() {
                value[..size].to_vec()
            } else {
                let mut cursor = Cursor::new(value.as_slice());
                let value_offset = if is_big_tiff { order.read_u64(&mut cursor)? } else { order.read_u32(&mut cursor)? as u64 };
                reader.seek(SeekFrom::Start(value_offset))?;
                let mut data = vec![0u8; size];
                reader.read_exact(&mut data)?;
                data
            };
            trace!("Tag {} type {} count {} ({} bytes)", tag, field_type, count, size);
            ifd.entries.push(IfdEntry { tag, field_type, count, data, byte_order: order });
        }

        Ok(ifd)
    }

    pub fn get(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.get(tag).is_some()
    }

    /// Add or replace an entry
    pub fn set(&mut self, entry: IfdEntry) {
        self.entries.retain(|e| e.tag != entry.tag);
        self.entries.push(entry);
    }

    /// Required integer tag
    pub fn require_u64(&self, tag: u16) -> GeorefResult<u64> {
        self.get(tag)
            .ok_or_else(|| GeorefError::Raster(format!("Missing required tag {}", tag)))?
            .first_u64()
    }

    /// Optional integer tag with a default
    pub fn u64_or(&self, tag: u16, default: u64) -> GeorefResult<u64> {
        match self.get(tag) {
            Some(entry) => entry.first_u64(),
            None => Ok(default),
        }
    }

    /// Entries ordered by tag, as they must appear in a file
    pub fn sorted_entries(&self) -> Vec<&IfdEntry> {
        let mut entries: Vec<&IfdEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.tag);
        entries
    }
}
