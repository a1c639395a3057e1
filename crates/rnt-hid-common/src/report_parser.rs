//! Bounds-checked cursors over report payloads
//!
//! Every multi-record frame (batched block I/O, I2C batches, chunked
//! memory card transfers) is packed and unpacked through these two types so
//! no offset arithmetic happens outside a length check.

use crate::{HidCommonError, HidCommonResult};

fn end_of_data(wanted: usize, remaining: usize) -> HidCommonError {
    HidCommonError::InvalidReport(format!(
        "Unexpected end of data: wanted {wanted} bytes, {remaining} left"
    ))
}

/// Read cursor over a received payload.
#[derive(Debug, Clone)]
pub struct ReportParser<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> HidCommonResult<u8> {
        let value = *self
            .buffer
            .get(self.position)
            .ok_or_else(|| end_of_data(1, 0))?;
        self.position += 1;
        Ok(value)
    }

    pub fn peek_u8(&self) -> HidCommonResult<u8> {
        self.buffer
            .get(self.position)
            .copied()
            .ok_or_else(|| end_of_data(1, 0))
    }

    pub fn read_u16_be(&mut self) -> HidCommonResult<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub fn read_u16_le(&mut self) -> HidCommonResult<u16> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn read_bytes(&mut self, count: usize) -> HidCommonResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| end_of_data(count, self.remaining()))?;
        let out = self
            .buffer
            .get(self.position..end)
            .ok_or_else(|| end_of_data(count, self.remaining()))?;
        self.position = end;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> HidCommonResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Consume one byte and fail unless it equals `expected`.
    pub fn expect_u8(&mut self, expected: u8, what: &str) -> HidCommonResult<()> {
        let got = self.read_u8()?;
        if got != expected {
            return Err(HidCommonError::InvalidReport(format!(
                "{what}: expected {expected:#04x}, got {got:#04x}"
            )));
        }
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> HidCommonResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = self.buffer.get(self.position..).unwrap_or(&[]);
        self.position = self.buffer.len();
        out
    }
}

/// Write cursor for a fixed-capacity outgoing frame.
///
/// Unwritten space is filled with the padding byte when the frame is
/// finished.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    buffer: Vec<u8>,
    capacity: usize,
    padding: u8,
}

impl ReportBuilder {
    pub fn new(capacity: usize) -> Self {
        Self::with_padding(capacity, 0x00)
    }

    pub fn with_padding(capacity: usize, padding: u8) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            padding,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.buffer.len())
    }

    /// Check that `count` more bytes would fit without writing anything.
    pub fn ensure_fits(&self, count: usize) -> HidCommonResult<()> {
        if count > self.remaining() {
            return Err(HidCommonError::Overflow {
                needed: self.buffer.len().saturating_add(count),
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> HidCommonResult<&mut Self> {
        self.ensure_fits(1)?;
        self.buffer.push(value);
        Ok(self)
    }

    pub fn write_u16_be(&mut self, value: u16) -> HidCommonResult<&mut Self> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> HidCommonResult<&mut Self> {
        self.ensure_fits(data.len())?;
        self.buffer.extend_from_slice(data);
        Ok(self)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Written bytes only, without padding.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// The whole frame, padded to capacity.
    pub fn into_padded(mut self) -> Vec<u8> {
        self.buffer.resize(self.capacity, self.padding);
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_parser_u8() -> HidCommonResult<()> {
        let data = [0x01, 0x02, 0x03];
        let mut parser = ReportParser::new(&data);
        assert_eq!(parser.read_u8()?, 0x01);
        assert_eq!(parser.remaining(), 2);
        assert_eq!(parser.read_u16_be()?, 0x0203);
        assert!(parser.read_u8().is_err());
        Ok(())
    }

    #[test]
    fn test_read_bytes_past_end_does_not_advance() {
        let data = [0xAA, 0xBB];
        let mut parser = ReportParser::new(&data);
        assert!(parser.read_bytes(3).is_err());
        assert_eq!(parser.position(), 0);
    }

    #[test]
    fn test_expect_u8_reports_mismatch() {
        let data = [0x81];
        let mut parser = ReportParser::new(&data);
        let err = parser.expect_u8(0x80, "opcode");
        assert!(matches!(err, Err(HidCommonError::InvalidReport(msg)) if msg.contains("0x80")));
    }

    #[test]
    fn test_builder_pads_with_fill_byte() -> HidCommonResult<()> {
        let mut builder = ReportBuilder::with_padding(6, 0xFF);
        builder.write_u8(0x81)?.write_bytes(&[1, 2])?;
        assert_eq!(builder.remaining(), 3);
        assert_eq!(builder.into_padded(), vec![0x81, 1, 2, 0xFF, 0xFF, 0xFF]);
        Ok(())
    }

    #[test]
    fn test_builder_rejects_overflow_without_partial_write() -> HidCommonResult<()> {
        let mut builder = ReportBuilder::new(4);
        builder.write_bytes(&[1, 2, 3])?;
        assert!(matches!(
            builder.write_bytes(&[4, 5]),
            Err(HidCommonError::Overflow {
                needed: 5,
                capacity: 4
            })
        ));
        assert_eq!(builder.as_slice(), &[1, 2, 3]);
        Ok(())
    }
}
