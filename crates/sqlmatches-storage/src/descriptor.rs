//! Upload descriptors, stored locations and body helpers.

use std::fmt;
use std::io;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Demo body as a stream of byte chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// The unit handed to a [`StorageBackend`] for one upload attempt.
///
/// [`StorageBackend`]: crate::StorageBackend
pub struct UploadDescriptor {
    community_id: String,
    match_id: String,
    content_length: u64,
    extension: String,
    body: ByteStream,
}

impl UploadDescriptor {
    /// Creates a descriptor for a streamed body of `content_length` bytes.
    ///
    /// Ids become path segments, so anything that could escape the
    /// community directory is rejected.
    pub fn new(
        community_id: impl Into<String>,
        match_id: impl Into<String>,
        content_length: u64,
        extension: impl Into<String>,
        body: ByteStream,
    ) -> StorageResult<Self> {
        let community_id = community_id.into();
        let match_id = match_id.into();

        validate_segment(&community_id)?;
        validate_segment(&match_id)?;

        Ok(Self {
            community_id,
            match_id,
            content_length,
            extension: extension.into(),
            body,
        })
    }

    /// Creates a descriptor from an in-memory buffer.
    pub fn from_bytes(
        community_id: impl Into<String>,
        match_id: impl Into<String>,
        extension: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> StorageResult<Self> {
        let bytes = bytes.into();
        let length = bytes.len() as u64;
        let body = stream::once(async move { Ok(bytes) }).boxed();
        Self::new(community_id, match_id, length, extension, body)
    }

    pub fn community_id(&self) -> &str {
        &self.community_id
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Declared byte length of the body.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Object key relative to the backend root: `{community}/{match}{ext}`.
    pub fn object_key(&self) -> String {
        format!("{}/{}{}", self.community_id, self.match_id, self.extension)
    }

    /// Consumes the descriptor and returns its body.
    pub fn into_body(self) -> ByteStream {
        self.body
    }
}

impl fmt::Debug for UploadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadDescriptor")
            .field("community_id", &self.community_id)
            .field("match_id", &self.match_id)
            .field("content_length", &self.content_length)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

fn validate_segment(segment: &str) -> StorageResult<()> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StorageError::invalid_path(format!(
            "'{segment}' is not a valid path segment"
        )));
    }

    Ok(())
}

/// Where a demo ended up, as recorded on the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLocation {
    /// Object key within the backend (includes any bucket prefix).
    pub key: String,
    /// Backend file id, for backends that delete by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl StoredLocation {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            file_id: None,
        }
    }

    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }
}

/// Splits a [`ByteStream`] into fixed-size parts, holding at most one part
/// in memory.
pub struct PartReader {
    body: ByteStream,
    pending: Bytes,
    part_size: usize,
    consumed: u64,
}

impl PartReader {
    pub fn new(body: ByteStream, part_size: usize) -> Self {
        Self {
            body,
            pending: Bytes::new(),
            part_size: part_size.max(1),
            consumed: 0,
        }
    }

    /// Total bytes handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the next part: exactly `part_size` bytes, or fewer for the
    /// last one. `None` once the body is exhausted.
    pub async fn next_part(&mut self) -> io::Result<Option<Bytes>> {
        let mut part = BytesMut::with_capacity(self.part_size);

        loop {
            if !self.pending.is_empty() {
                let take = (self.part_size - part.len()).min(self.pending.len());
                part.extend_from_slice(&self.pending.split_to(take));
            }

            if part.len() == self.part_size {
                break;
            }

            match self.body.try_next().await? {
                Some(chunk) => self.pending = chunk,
                None => break,
            }
        }

        if part.is_empty() {
            return Ok(None);
        }

        self.consumed += part.len() as u64;
        Ok(Some(part.freeze()))
    }
}

/// Reads a whole body into memory, failing once it grows past `limit` or
/// if it does not match the declared length.
#[cfg(feature = "s3")]
pub(crate) async fn collect_body(
    mut body: ByteStream,
    expected: u64,
    limit: u64,
) -> StorageResult<Bytes> {
    if expected > limit {
        return Err(StorageError::TooLarge {
            size: expected,
            limit,
        });
    }

    let mut buffer = BytesMut::with_capacity(expected as usize);

    while let Some(chunk) = body.try_next().await? {
        let size = (buffer.len() + chunk.len()) as u64;
        if size > limit {
            return Err(StorageError::TooLarge { size, limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    let actual = buffer.len() as u64;
    if actual != expected {
        return Err(StorageError::LengthMismatch { expected, actual });
    }

    Ok(buffer.freeze())
}
