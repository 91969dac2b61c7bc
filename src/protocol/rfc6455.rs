//! The bundled frame codec: RFC 6455 framing with client-side masking.

use crate::codec::{Encode, FrameCodec, FrameKind, unsupported};
use crate::config::Limits;
use crate::error::Result;
use crate::protocol::frame::{OpCode, encode_frame};
use crate::protocol::incoming::IncomingFrames;

/// Versions this codec can frame for: the hybi drafts and RFC 6455.
const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u8> = 7..=13;

/// Frame codec for the hybi framing format (protocol versions 7–13).
///
/// Ping, pong, binary and close frames did not exist before the hybi
/// drafts; asking for one at an older negotiated version is reported as
/// an unsupported operation instead of being put on the wire.
pub struct Rfc6455Codec {
    limits: Limits,
    mask_state: u32,
}

impl Rfc6455Codec {
    /// Create a codec enforcing the given limits on inbound traffic.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            mask_state: mask_seed(),
        }
    }

    /// Successive masks from a mixed counter. Masks need to be unpredictable
    /// enough to defeat proxy cache poisoning, not cryptographically strong.
    fn next_mask(&mut self) -> [u8; 4] {
        self.mask_state = self.mask_state.wrapping_add(0x9E37_79B9);
        let mut x = self.mask_state;
        x = x.wrapping_mul(0x85EB_CA6B);
        x ^= x >> 13;
        x = x.wrapping_mul(0xC2B2_AE35);
        x.to_le_bytes()
    }
}

impl Default for Rfc6455Codec {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

/// Seed mask generation from system entropy, falling back to the clock.
fn mask_seed() -> u32 {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_ok() {
        u32::from_le_bytes(buf)
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0x5851_F42D)
    }
}

impl FrameCodec for Rfc6455Codec {
    type Assembler = IncomingFrames;

    fn encode(
        &mut self,
        kind: FrameKind,
        payload: &[u8],
        close_code: Option<u16>,
        version: u8,
    ) -> Result<Encode> {
        let hybi = SUPPORTED_VERSIONS.contains(&version);
        let supported = match kind {
            FrameKind::Text => true,
            FrameKind::Binary | FrameKind::Ping | FrameKind::Pong | FrameKind::Close => hybi,
        };
        if !supported {
            return Err(unsupported(kind, version));
        }

        let (opcode, data) = match kind {
            FrameKind::Text => (OpCode::Text, payload.to_vec()),
            FrameKind::Binary => (OpCode::Binary, payload.to_vec()),
            FrameKind::Ping => (OpCode::Ping, payload.to_vec()),
            FrameKind::Pong => (OpCode::Pong, payload.to_vec()),
            FrameKind::Close => (OpCode::Close, close_payload(close_code, payload)),
        };

        if kind.is_control() && data.len() > crate::protocol::frame::MAX_CONTROL_PAYLOAD {
            return Err(crate::error::Error::ControlFrameTooLarge(data.len()));
        }

        let mask = self.next_mask();
        Ok(Encode::Frame(encode_frame(opcode, &data, mask)))
    }

    fn assembler(&self, _version: u8) -> IncomingFrames {
        IncomingFrames::new(self.limits.clone())
    }
}

/// Close payload layout: optional 2-byte big-endian code, then the reason.
fn close_payload(code: Option<u16>, reason: &[u8]) -> Vec<u8> {
    match code {
        Some(code) => {
            let mut data = Vec::with_capacity(2 + reason.len());
            data.extend_from_slice(&code.to_be_bytes());
            data.extend_from_slice(reason);
            data
        }
        None => reason.to_vec(),
    }
}
