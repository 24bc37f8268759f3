//! Stream framing
//!
//! TCP delivers the controller's frames as an arbitrary byte stream: a read
//! may hold half a frame or several. [`FrameCodec`] reassembles complete
//! frames using the header's body length, resynchronising on the magic if
//! the stream is ever misaligned. A candidate whose checksum fails is
//! dropped one byte at a time, so a corrupted length can't swallow the
//! frame behind it.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};
use zonetouch_core::checksum;
use zonetouch_core::constants::{CRC_SIZE, FRAME_MAGIC, HEADER_SIZE, MAX_BODY_SIZE};

use crate::error::Error;

/// Splits a byte stream into complete, undecoded frames
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_MAGIC.len())
        .position(|window| window == FRAME_MAGIC)
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match find_magic(src) {
                Some(0) => {}
                Some(skip) => {
                    warn!(skipped = skip, "Discarding bytes before frame start");
                    src.advance(skip);
                }
                None => {
                    // a magic may straddle the next read
                    let keep = FRAME_MAGIC.len() - 1;
                    if src.len() > keep {
                        let skip = src.len() - keep;
                        warn!(skipped = skip, "No frame start in buffer");
                        src.advance(skip);
                    }
                    return Ok(None);
                }
            }

            if src.len() < HEADER_SIZE {
                return Ok(None);
            }

            let body_length = u16::from_be_bytes([src[8], src[9]]) as usize;
            if body_length > MAX_BODY_SIZE {
                warn!(body_length, "Implausible body length, resyncing");
                src.advance(1);
                continue;
            }

            let frame_len = HEADER_SIZE + body_length + CRC_SIZE;
            if src.len() < frame_len {
                src.reserve(frame_len - src.len());
                return Ok(None);
            }

            if !checksum::verify(&src[..frame_len]) {
                warn!(body_length, "Checksum mismatch, resyncing");
                src.advance(1);
                continue;
            }

            let frame = src.split_to(frame_len).freeze();
            trace!(len = frame.len(), "Framed {}", hex::encode(&frame));
            return Ok(Some(frame));
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
