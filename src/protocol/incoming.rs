//! The bundled data-phase assembler: raw bytes in, complete frames out.

use bytes::{Buf, BytesMut};

use crate::codec::{FrameAssembler, FrameKind, InboundFrame};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::frame::{OpCode, WireFrame, parse_frame};

/// Accumulates inbound bytes and yields complete messages and control
/// frames in arrival order.
///
/// Fragmented text/binary messages are reassembled internally; the
/// fragments never surface. A malformed stream latches a terminal error:
/// no frames are yielded past it and [`error`](FrameAssembler::error)
/// reports it until the assembler is dropped with its connection.
pub struct IncomingFrames {
    buffer: BytesMut,
    limits: Limits,
    partial: Vec<u8>,
    partial_kind: Option<FrameKind>,
    fragments: usize,
    failed: Option<Error>,
}

impl IncomingFrames {
    /// Create an assembler enforcing the given limits.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            limits,
            partial: Vec::new(),
            partial_kind: None,
            fragments: 0,
            failed: None,
        }
    }

    fn pull(&mut self) -> Result<Option<InboundFrame>> {
        loop {
            let Some((frame, consumed)) = parse_frame(&self.buffer, self.limits.max_frame_size)?
            else {
                return Ok(None);
            };
            self.buffer.advance(consumed);
            if let Some(complete) = self.accept(frame)? {
                return Ok(Some(complete));
            }
            // a non-final fragment was absorbed, keep pulling
        }
    }

    fn accept(&mut self, frame: WireFrame) -> Result<Option<InboundFrame>> {
        match frame.opcode {
            OpCode::Close => Ok(Some(InboundFrame {
                kind: FrameKind::Close,
                payload: frame.payload,
            })),
            OpCode::Ping => Ok(Some(InboundFrame {
                kind: FrameKind::Ping,
                payload: frame.payload,
            })),
            OpCode::Pong => Ok(Some(InboundFrame {
                kind: FrameKind::Pong,
                payload: frame.payload,
            })),
            OpCode::Text | OpCode::Binary => {
                if self.partial_kind.is_some() {
                    return Err(Error::ProtocolViolation(
                        "expected a continuation frame".into(),
                    ));
                }
                let kind = if frame.opcode == OpCode::Text {
                    FrameKind::Text
                } else {
                    FrameKind::Binary
                };
                self.limits.check_message_size(frame.payload.len())?;
                if frame.fin {
                    return self.finish(kind, frame.payload).map(Some);
                }
                self.partial_kind = Some(kind);
                self.partial = frame.payload;
                self.fragments = 1;
                Ok(None)
            }
            OpCode::Continuation => {
                let Some(kind) = self.partial_kind else {
                    return Err(Error::ProtocolViolation(
                        "continuation frame without a message in progress".into(),
                    ));
                };
                self.fragments += 1;
                self.limits.check_fragment_count(self.fragments)?;
                self.limits
                    .check_message_size(self.partial.len() + frame.payload.len())?;
                self.partial.extend_from_slice(&frame.payload);
                if frame.fin {
                    let payload = std::mem::take(&mut self.partial);
                    return self.finish(kind, payload).map(Some);
                }
                Ok(None)
            }
        }
    }

    fn finish(&mut self, kind: FrameKind, payload: Vec<u8>) -> Result<InboundFrame> {
        self.partial_kind = None;
        self.fragments = 0;
        if kind == FrameKind::Text && std::str::from_utf8(&payload).is_err() {
            return Err(Error::InvalidUtf8);
        }
        Ok(InboundFrame { kind, payload })
    }
}

impl FrameAssembler for IncomingFrames {
    fn extend(&mut self, data: &[u8]) {
        if self.failed.is_none() {
            self.buffer.extend_from_slice(data);
        }
    }

    fn next(&mut self) -> Option<InboundFrame> {
        if self.failed.is_some() {
            return None;
        }
        match self.pull() {
            Ok(frame) => frame,
            Err(err) => {
                self.failed = Some(err);
                None
            }
        }
    }

    fn error(&self) -> Option<&Error> {
        self.failed.as_ref()
    }
}
