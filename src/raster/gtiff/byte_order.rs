//! Byte order of a TIFF file

use std::io::{Read, Result};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::errors::{GeorefError, GeorefResult};
use crate::raster::DataType;
use super::constants::header;

/// Byte order declared in the TIFF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// "II"
    LittleEndian,
    /// "MM"
    BigEndian,
}

impl ByteOrder {
    /// Read the two-byte marker at the start of the file
    pub fn detect(reader: &mut impl Read) -> GeorefResult<Self> {
        let mut marker = [0u8; 2];
        reader.read_exact(&mut marker)?;
        match marker {
            header::LITTLE_ENDIAN_MARKER => Ok(ByteOrder::LittleEndian),
            header::BIG_ENDIAN_MARKER => Ok(ByteOrder::BigEndian),
            _ => Err(GeorefError::Raster(format!("Invalid byte order marker: {:02x?}", marker))),
        }
    }

    pub fn read_u16(&self, reader: &mut impl Read) -> Result<u16> {
        match self {
            ByteOrder::LittleEndian => reader.read_u16::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_u16::<BigEndian>(),
        }
    }

    pub fn read_u32(&self, reader: &mut impl Read) -> Result<u32> {
        match self {
            ByteOrder::LittleEndian => reader.read_u32::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_u32::<BigEndian>(),
        }
    }

    pub fn read_u64(&self, reader: &mut impl Read) -> Result<u64> {
        match self {
            ByteOrder::LittleEndian => reader.read_u64::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_u64::<BigEndian>(),
        }
    }

    pub fn read_f32(&self, reader: &mut impl Read) -> Result<f32> {
        match self {
            ByteOrder::LittleEndian => reader.read_f32::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_f32::<BigEndian>(),
        }
    }

    pub fn read_f64(&self, reader: &mut impl Read) -> Result<f64> {
        match self {
            ByteOrder::LittleEndian => reader.read_f64::<LittleEndian>(),
            ByteOrder::BigEndian => reader.read_f64::<BigEndian>(),
        }
    }

    /// Read one raster sample of the given type
    pub fn read_sample(&self, reader: &mut impl Read, data_type: DataType) -> Result<f64> {
        Ok(match data_type {
            DataType::Byte => reader.read_u8()? as f64,
            DataType::UInt16 => self.read_u16(reader)? as f64,
            DataType::Int16 => self.read_u16(reader)? as i16 as f64,
            DataType::Float32 => self.read_f32(reader)? as f64,
            DataType::Float64 => self.read_f64(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect() {
        assert_eq!(ByteOrder::detect(&mut Cursor::new(b"II*\0")).unwrap(), ByteOrder::LittleEndian);
        assert_eq!(ByteOrder::detect(&mut Cursor::new(b"MM\0*")).unwrap(), ByteOrder::BigEndian);
        assert!(ByteOrder::detect(&mut Cursor::new(b"XX")).is_err());
    }

    #[test]
    fn test_read_sample_respects_order() {
        let bytes = [0x01u8, 0x02];
        assert_eq!(ByteOrder::LittleEndian.read_sample(&mut Cursor::new(bytes), DataType::UInt16).unwrap(), 513.0);
        assert_eq!(ByteOrder::BigEndian.read_sample(&mut Cursor::new(bytes), DataType::UInt16).unwrap(), 258.0);
        let negative = (-3i16).to_le_bytes();
        assert_eq!(ByteOrder::LittleEndian.read_sample(&mut Cursor::new(negative), DataType::Int16).unwrap(), -3.0);
    }
}
