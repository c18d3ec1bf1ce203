//! Bounds-checked reading of instruction bytes.

use cpu::decode::DecoderError;

/// Architectural limit for the length of a single instruction.
pub const MAX_INSTRUCTION_LEN: usize = 15;

/// Sequential reader over the decoder's input buffer.
///
/// The cursor remembers where the current instruction started so that it can
/// enforce the 15 byte length limit and report field offsets relative to the
/// instruction.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    /// Index of the next byte that will be read.
    pos: usize,
    /// Index of the first byte of the current instruction.
    start: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the index of the next byte to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor. Positions past the end are clamped to the buffer
    /// length.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
        self.start = self.pos;
    }

    /// Number of bytes that have not been read yet.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Marks the current position as the start of a new instruction.
    pub fn begin_instruction(&mut self) {
        self.start = self.pos;
    }

    /// Number of bytes consumed since `begin_instruction`.
    pub fn instruction_len(&self) -> usize {
        self.pos - self.start
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&self) -> Result<u8, DecoderError> {
        self.bytes
            .get(self.pos)
            .cloned()
            .ok_or_else(DecoderError::out_of_bounds)
    }

    /// Reads a single byte from the instruction stream.
    pub fn read(&mut self) -> Result<u8, DecoderError> {
        if self.instruction_len() == MAX_INSTRUCTION_LEN {
            // This would read the 16th byte, hitting the length limit.
            return Err(DecoderError::too_long());
        }

        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    /// Reads a little-endian 16-bit word.
    pub fn read_u16(&mut self) -> Result<u16, DecoderError> {
        let (b0, b1) = (
            self.read()? as u16,
            self.read()? as u16,
        );

        Ok(b1 << 8 | b0)
    }

    /// Reads a little-endian 32-bit doubleword.
    pub fn read_u32(&mut self) -> Result<u32, DecoderError> {
        let (b0, b1, b2, b3) = (
            self.read()? as u32,
            self.read()? as u32,
            self.read()? as u32,
            self.read()? as u32,
        );

        Ok(
            b3 << 24 |
            b2 << 16 |
            b1 << 8 |
            b0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let bytes = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.peek().unwrap(), 0xAA);
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.read().unwrap(), 0xAA);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn out_of_bounds() {
        let bytes = [0x0F, 0xF8];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.read().unwrap();
        assert_eq!(cursor.peek().unwrap(), 0xF8);
        cursor.read().unwrap();
        assert_eq!(cursor.peek(), Err(DecoderError::OutOfBounds));
        assert_eq!(cursor.read(), Err(DecoderError::OutOfBounds));
        assert_eq!(cursor.position(), 2);

        let mut cursor = ByteCursor::new(&bytes[1..]);
        assert_eq!(cursor.read_u16(), Err(DecoderError::OutOfBounds));
    }

    #[test]
    fn length_limit() {
        let bytes = [0x66; 20];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.read().unwrap();
        cursor.begin_instruction();
        for _ in 0..MAX_INSTRUCTION_LEN {
            cursor.read().unwrap();
        }
        assert_eq!(cursor.instruction_len(), 15);
        assert_eq!(cursor.read(), Err(DecoderError::TooLong));

        cursor.begin_instruction();
        assert_eq!(cursor.instruction_len(), 0);
        assert_eq!(cursor.read().unwrap(), 0x66);
    }

    #[test]
    fn set_position_clamps() {
        let bytes = [1, 2, 3];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.set_position(2);
        assert_eq!(cursor.read().unwrap(), 3);
        cursor.set_position(10);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.instruction_len(), 0);
    }
}
