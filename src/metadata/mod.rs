use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("metadata payload shorter than declared")]
    Truncated,
    #[error("metadata string is not valid UTF-8")]
    InvalidUtf8,
}

/// The frame-0 descriptor: everything the decoder needs to reassemble and
/// name the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    /// Plaintext byte length of the user's file (not the ciphertext length).
    pub original_size: u32,
    pub mime: String,
    pub encrypted: bool,
}

/// Layout: `u32 nameLen | name | u32 origSize | u32 mimeLen | mime | u8 encrypted`,
/// integers little-endian, strings UTF-8.
pub fn encode_metadata(meta: &FileMetadata) -> Vec<u8> {
    let name = meta.name.as_bytes();
    let mime = meta.mime.as_bytes();
    let mut buf = Vec::with_capacity(13 + name.len() + mime.len());

    let mut scratch = [0u8; 4];
    LittleEndian::write_u32(&mut scratch, name.len() as u32);
    buf.extend_from_slice(&scratch);
    buf.extend_from_slice(name);
    LittleEndian::write_u32(&mut scratch, meta.original_size);
    buf.extend_from_slice(&scratch);
    LittleEndian::write_u32(&mut scratch, mime.len() as u32);
    buf.extend_from_slice(&scratch);
    buf.extend_from_slice(mime);
    buf.push(meta.encrypted as u8);
    buf
}

pub fn decode_metadata(payload: &[u8]) -> Result<FileMetadata, MetadataError> {
    let mut cursor = Cursor { buf: payload, pos: 0 };

    let name_len = cursor.read_u32()? as usize;
    let name = cursor.read_str(name_len)?;
    let original_size = cursor.read_u32()?;
    let mime_len = cursor.read_u32()? as usize;
    let mime = cursor.read_str(mime_len)?;
    let encrypted = cursor.read_u8()? != 0;

    Ok(FileMetadata {
        name,
        original_size,
        mime,
        encrypted,
    })
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], MetadataError> {
        let end = self.pos.checked_add(len).ok_or(MetadataError::Truncated)?;
        if end > self.buf.len() {
            return Err(MetadataError::Truncated);
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, MetadataError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn read_u8(&mut self) -> Result<u8, MetadataError> {
        Ok(self.take(1)?[0])
    }

    fn read_str(&mut self, len: usize) -> Result<String, MetadataError> {
        std::str::from_utf8(self.take(len)?)
            .map(str::to_owned)
            .map_err(|_| MetadataError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileMetadata {
        FileMetadata {
            name: "a.bin".into(),
            original_size: 256,
            mime: "application/octet-stream".into(),
            encrypted: false,
        }
    }

    #[test]
    fn test_roundtrip() {
        let meta = sample();
        let decoded = decode_metadata(&encode_metadata(&meta)).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_roundtrip_encrypted_unicode_name() {
        let meta = FileMetadata {
            name: "Фото – 2024 🎞.tar".into(),
            original_size: u32::MAX,
            mime: "video/mp4".into(),
            encrypted: true,
        };
        let decoded = decode_metadata(&encode_metadata(&meta)).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_empty_strings() {
        let meta = FileMetadata {
            name: String::new(),
            original_size: 0,
            mime: String::new(),
            encrypted: false,
        };
        assert_eq!(encode_metadata(&meta).len(), 13);
        assert_eq!(decode_metadata(&encode_metadata(&meta)).unwrap(), meta);
    }

    #[test]
    fn test_truncated_payload() {
        let encoded = encode_metadata(&sample());
        for cut in [0, 3, 4, encoded.len() - 1] {
            assert!(matches!(
                decode_metadata(&encoded[..cut]),
                Err(MetadataError::Truncated)
            ));
        }
    }

    #[test]
    fn test_name_length_overruns_payload() {
        let mut encoded = encode_metadata(&sample());
        LittleEndian::write_u32(&mut encoded[0..4], u32::MAX);
        assert!(matches!(
            decode_metadata(&encoded),
            Err(MetadataError::Truncated)
        ));
    }

    #[test]
    fn test_invalid_utf8_name() {
        let mut encoded = encode_metadata(&sample());
        encoded[4] = 0xFF; // first name byte
        assert!(matches!(
            decode_metadata(&encoded),
            Err(MetadataError::InvalidUtf8)
        ));
    }
}
