use anyhow::{Context, Result, bail};
use codedrop_core::TransferPayload;
use serde::{Deserialize, Serialize};

/// Data channel messages stay below the SCTP limit common to browsers and webrtc-rs.
pub(crate) const CHUNK_SIZE: usize = 16 * 1024;

/// Encoded payloads larger than this are neither sent nor accepted.
pub const MAX_PAYLOAD_SIZE: usize = 512 * 1024 * 1024;

/// One data channel message: a slice of a postcard-encoded [`TransferPayload`].
#[derive(Debug, Serialize, Deserialize)]
struct WireChunk {
    last: bool,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
}

/// Encode a payload into data channel messages, in send order.
pub(crate) fn encode_chunks(payload: &TransferPayload) -> Result<Vec<Vec<u8>>> {
    encode_chunks_within(payload, MAX_PAYLOAD_SIZE)
}

fn encode_chunks_within(payload: &TransferPayload, limit: usize) -> Result<Vec<Vec<u8>>> {
    let encoded = postcard::to_allocvec(payload).context("failed to encode payload")?;
    if encoded.len() > limit {
        bail!(
            "{} payload is {} bytes encoded, limit is {}",
            payload.kind(),
            encoded.len(),
            limit
        );
    }
    let count = encoded.len().div_ceil(CHUNK_SIZE).max(1);

    let mut frames = Vec::with_capacity(count);
    for (idx, data) in encoded.chunks(CHUNK_SIZE).enumerate() {
        let chunk = WireChunk {
            last: idx + 1 == count,
            data: data.to_vec(),
        };
        frames.push(postcard::to_allocvec(&chunk).context("failed to encode chunk")?);
    }
    Ok(frames)
}

/// Collects chunks until a whole payload is available.
#[derive(Debug, Default)]
pub(crate) struct Reassembler {
    buf: Vec<u8>,
}

impl Reassembler {
    pub(crate) fn push(&mut self, frame: &[u8]) -> Result<Option<TransferPayload>> {
        let chunk: WireChunk = postcard::from_bytes(frame).context("malformed chunk")?;

        if self.buf.len() + chunk.data.len() > MAX_PAYLOAD_SIZE {
            self.buf.clear();
            bail!("payload exceeds {} bytes", MAX_PAYLOAD_SIZE);
        }
        self.buf.extend_from_slice(&chunk.data);

        if !chunk.last {
            return Ok(None);
        }

        let encoded = std::mem::take(&mut self.buf);
        let payload = postcard::from_bytes(&encoded).context("malformed payload")?;
        Ok(Some(payload))
    }
}
