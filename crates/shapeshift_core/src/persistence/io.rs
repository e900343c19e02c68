//! Little-endian field writer and version-aware reader.

use shapeshift_shared::{Color, Quaternion, Transform, Vec3};

use crate::error::{CoreError, CoreResult};
use crate::random::RandomState;

/// Appends fixed-width little-endian fields to a buffer.
#[derive(Debug, Default, Clone)]
pub struct SaveWriter {
    buf: Vec<u8>,
}

impl SaveWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finishes writing.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes an `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a `u64`.
    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a `u128`.
    pub fn write_u128(&mut self, value: u128) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes an `f32`.
    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a length-prefixed byte block.
    pub fn write_block(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.buf.extend_from_slice(bytes);
    }

    /// Writes three floats.
    pub fn write_vec3(&mut self, v: Vec3) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
    }

    /// Writes four floats.
    pub fn write_quaternion(&mut self, q: Quaternion) {
        self.write_f32(q.x);
        self.write_f32(q.y);
        self.write_f32(q.z);
        self.write_f32(q.w);
    }

    /// Writes RGBA.
    pub fn write_color(&mut self, c: Color) {
        self.write_f32(c.r);
        self.write_f32(c.g);
        self.write_f32(c.b);
        self.write_f32(c.a);
    }

    /// Writes position, rotation, scale.
    pub fn write_transform(&mut self, t: &Transform) {
        self.write_vec3(t.position);
        self.write_quaternion(t.rotation);
        self.write_vec3(t.scale);
    }

    /// Writes a ChaCha snapshot: seed, stream, word position.
    pub fn write_random_state(&mut self, state: &RandomState) {
        self.buf.extend_from_slice(&state.seed);
        self.write_u64(state.stream);
        self.write_u128(state.word_pos);
    }
}

/// Reads fields back, tracking the file's format version.
#[derive(Debug, Clone)]
pub struct SaveReader<'a> {
    data: &'a [u8],
    offset: usize,
    version: i32,
}

impl<'a> SaveReader<'a> {
    /// Creates a reader over `data` written with format `version`.
    #[must_use]
    pub const fn new(data: &'a [u8], version: i32) -> Self {
        Self { data, offset: 0, version }
    }

    /// Format version of the data.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// Current byte offset.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn take(&mut self, needed: usize) -> CoreResult<&'a [u8]> {
        let available = self.remaining();
        if needed > available {
            return Err(CoreError::Truncated { offset: self.offset, needed, available });
        }
        let bytes = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> CoreResult<[u8; N]> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads an `i32`.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_i32(&mut self) -> CoreResult<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Reads a `u64`.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_u64(&mut self) -> CoreResult<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Reads a `u128`.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_u128(&mut self) -> CoreResult<u128> {
        Ok(u128::from_le_bytes(self.take_array()?))
    }

    /// Reads an `f32`.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_f32(&mut self) -> CoreResult<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Reads a non-negative `i32` count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSaveData` for negative counts.
    pub fn read_count(&mut self, what: &str) -> CoreResult<usize> {
        let raw = self.read_i32()?;
        usize::try_from(raw)
            .map_err(|_| CoreError::InvalidSaveData(format!("negative {what} count {raw}")))
    }

    /// Reads a length-prefixed byte block.
    ///
    /// # Errors
    ///
    /// Fails on a negative length or truncated data.
    pub fn read_block(&mut self) -> CoreResult<&'a [u8]> {
        let len = self.read_count("block length")?;
        self.take(len)
    }

    /// Reads three floats.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_vec3(&mut self) -> CoreResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Reads four floats.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_quaternion(&mut self) -> CoreResult<Quaternion> {
        Ok(Quaternion::new(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Reads RGBA.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_color(&mut self) -> CoreResult<Color> {
        Ok(Color::new(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Reads position, rotation, scale.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_transform(&mut self) -> CoreResult<Transform> {
        Ok(Transform::new(self.read_vec3()?, self.read_quaternion()?, self.read_vec3()?))
    }

    /// Reads a ChaCha snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` at end of data.
    pub fn read_random_state(&mut self) -> CoreResult<RandomState> {
        let seed = self.take_array::<32>()?;
        Ok(RandomState { seed, stream: self.read_u64()?, word_pos: self.read_u128()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_read_back_in_order() {
        let mut writer = SaveWriter::new();
        writer.write_i32(-7);
        writer.write_f32(0.25);
        writer.write_block(b"abc");
        writer.write_vec3(Vec3::new(1.0, 2.0, 3.0));
        let bytes = writer.into_bytes();

        let mut reader = SaveReader::new(&bytes, 7);
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.read_f32().unwrap(), 0.25);
        assert_eq!(reader.read_block().unwrap(), b"abc");
        assert_eq!(reader.read_vec3().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let bytes = [1_u8, 0, 0, 0, 9, 9];
        let mut reader = SaveReader::new(&bytes, 7);
        reader.read_i32().unwrap();
        assert_eq!(
            reader.read_f32(),
            Err(CoreError::Truncated { offset: 4, needed: 4, available: 2 })
        );
    }

    #[test]
    fn test_negative_block_length_is_invalid() {
        let mut writer = SaveWriter::new();
        writer.write_i32(-1);
        let bytes = writer.into_bytes();
        let mut reader = SaveReader::new(&bytes, 7);
        assert!(matches!(reader.read_block(), Err(CoreError::InvalidSaveData(_))));
    }
}
