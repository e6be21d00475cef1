// crates/webcodec-types/src/packet.rs
//
// EncodedVideoChunk: the compressed-bitstream counterpart to VideoFrame.

use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Key,
    Delta,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Key => "key",
            ChunkType::Delta => "delta",
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, ChunkType::Key)
    }
}

/// An owned, closable compressed bitstream unit.
#[derive(Debug)]
pub struct EncodedVideoChunk {
    chunk_type: ChunkType,
    timestamp: i64,
    duration: Option<i64>,
    data: Vec<u8>,
    closed: bool,
}

impl EncodedVideoChunk {
    pub fn new(chunk_type: ChunkType, timestamp: i64, duration: Option<i64>, data: Vec<u8>) -> Self {
        EncodedVideoChunk { chunk_type, timestamp, duration, data, closed: false }
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn duration(&self) -> Option<i64> {
        self.duration
    }

    pub fn byte_length(&self) -> Result<usize, CodecError> {
        if self.closed {
            return Err(CodecError::invalid_state("EncodedVideoChunk is closed"));
        }
        Ok(self.data.len())
    }

    pub fn data(&self) -> Result<&[u8], CodecError> {
        if self.closed {
            return Err(CodecError::invalid_state("EncodedVideoChunk is closed"));
        }
        Ok(&self.data)
    }

    /// Copy the whole payload into `dest`. Per W3C `copyTo`, `dest` must be
    /// at least `byte_length()` bytes.
    pub fn copy_to(&self, dest: &mut [u8]) -> Result<(), CodecError> {
        let data = self.data()?;
        if dest.len() < data.len() {
            return Err(CodecError::validation("destination buffer too small"));
        }
        dest[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.data = Vec::new();
            self.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_to_rejects_undersized_buffer() {
        let chunk = EncodedVideoChunk::new(ChunkType::Key, 0, None, vec![1, 2, 3, 4]);
        let mut dest = vec![0u8; 2];
        assert!(chunk.copy_to(&mut dest).is_err());
    }

    #[test]
    fn copy_to_copies_full_payload() {
        let chunk = EncodedVideoChunk::new(ChunkType::Delta, 5, Some(33), vec![9, 8, 7]);
        let mut dest = vec![0u8; 3];
        chunk.copy_to(&mut dest).unwrap();
        assert_eq!(dest, vec![9, 8, 7]);
    }

    #[test]
    fn close_clears_payload_and_is_idempotent() {
        let mut chunk = EncodedVideoChunk::new(ChunkType::Key, 0, None, vec![1]);
        chunk.close();
        assert!(chunk.data().is_err());
        chunk.close();
    }
}
