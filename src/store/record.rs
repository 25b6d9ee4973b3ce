//! On-disk log record format
//!
//! ```text
//! +---------------+
//! | Record Length |  (u32 LE, total length including this field and the checksum)
//! +---------------+
//! | Key           |  (length-prefixed bytes)
//! +---------------+
//! | Tombstone     |  (u8: 0 = live, 1 = deleted)
//! +---------------+
//! | Value         |  (length-prefixed bytes, empty for tombstones)
//! +---------------+
//! | Checksum      |  (u32 LE, CRC32 over everything before it)
//! +---------------+
//! ```

/// Smallest possible record: length + empty key + tombstone + empty value + checksum.
pub(crate) const MIN_RECORD_LEN: usize = 4 + 4 + 1 + 4 + 4;

/// Why a record could not be decoded.
///
/// `Truncated` means the buffer ends before the record does — at the log
/// tail this is crash residue, not corruption. `Invalid` means the bytes are
/// all there but wrong.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DecodeError {
    Truncated,
    Invalid(String),
}

/// A single key-value record as it appears in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub is_tombstone: bool,
}

impl LogRecord {
    /// A live record carrying a value.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_tombstone: false,
        }
    }

    /// A tombstone marking the key as deleted.
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            is_tombstone: true,
        }
    }

    /// Total encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        MIN_RECORD_LEN + self.key.len() + self.value.len()
    }

    /// Append the encoded record to `buf`.
    ///
    /// Encoding into a shared buffer lets a batch of records reach the file
    /// in a single write.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let record_len = self.encoded_len() as u32;
        let start = buf.len();

        buf.extend_from_slice(&record_len.to_le_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.push(u8::from(self.is_tombstone));
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value);

        let checksum = crc32(&buf[start..]);
        buf.extend_from_slice(&checksum.to_le_bytes());
    }

    /// Encode the record into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one record from the front of `data`, verifying the checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub(crate) fn decode(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        if data.len() < 4 {
            return Err(DecodeError::Truncated);
        }

        let record_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_len < MIN_RECORD_LEN {
            return Err(DecodeError::Invalid(format!(
                "record length {} below minimum {}",
                record_len, MIN_RECORD_LEN
            )));
        }
        if data.len() < record_len {
            return Err(DecodeError::Truncated);
        }

        let checksum_offset = record_len - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = crc32(&data[..checksum_offset]);
        if stored != computed {
            return Err(DecodeError::Invalid(format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            )));
        }

        // Body layout: key_len, key, tombstone, value_len, value
        let body = &data[4..checksum_offset];
        if body.len() < 4 {
            return Err(DecodeError::Invalid("record body too short".to_string()));
        }
        let key_len = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
        let after_key = 4 + key_len;
        if body.len() < after_key + 1 + 4 {
            return Err(DecodeError::Invalid("key overruns record".to_string()));
        }
        let key = body[4..after_key].to_vec();
        let is_tombstone = match body[after_key] {
            0 => false,
            1 => true,
            other => {
                return Err(DecodeError::Invalid(format!(
                    "invalid tombstone flag {}",
                    other
                )))
            }
        };
        let value_len_at = after_key + 1;
        let value_len = u32::from_le_bytes([
            body[value_len_at],
            body[value_len_at + 1],
            body[value_len_at + 2],
            body[value_len_at + 3],
        ]) as usize;
        let value_at = value_len_at + 4;
        if body.len() != value_at + value_len {
            return Err(DecodeError::Invalid("value length disagrees with record length".to_string()));
        }
        let value = body[value_at..].to_vec();

        Ok((
            Self {
                key,
                value,
                is_tombstone,
            },
            record_len,
        ))
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
