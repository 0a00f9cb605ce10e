//! Frame codec.
//!
//! Decodes frames from a [`MessageInput`] buffer and reassembles
//! fragmented messages; encodes outgoing frames into a pending buffer.
//! Both directions suspend instead of blocking.

use std::io::{ErrorKind, Error as IoError};
use std::marker::PhantomData;
use std::task::{Poll, ready};

use crate::channel::ByteChannel;
use crate::error::{Error, FrameError};
use crate::frame::{FrameHead, Fin, OpCode, Mask, PayloadLen, mask};
use crate::message::MessageInput;
use crate::role::RoleHelper;

/// Hard cap on a single frame, and on a reassembled message.
pub const MAX_FRAME_SIZE: u64 = 0x8000000;

/// Max payload of a control frame.
pub const MAX_CONTROL_SIZE: u64 = 125;

/// Complete message, or control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Payload of a text message.
    pub fn text(&self) -> Option<&str> {
        match self.opcode {
            OpCode::Text => std::str::from_utf8(&self.payload).ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_text(&self) -> bool { self.opcode == OpCode::Text }

    #[inline]
    pub fn is_binary(&self) -> bool { self.opcode == OpCode::Binary }

    #[inline]
    pub fn into_payload(self) -> Vec<u8> { self.payload }
}

/// Websocket frame codec for one connection.
pub struct FrameCodec<Role> {
    input: MessageInput,
    output: Vec<u8>,
    flushed: usize,
    // opcode and data of an open fragmented message
    fragment: Option<(OpCode, Vec<u8>)>,
    max_frame: u64,
    close_sent: bool,
    _marker: PhantomData<Role>,
}

impl<Role> std::fmt::Debug for FrameCodec<Role> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("buffered", &self.input.buffered().len())
            .field("pending", &(self.output.len() - self.flushed))
            .field("fragment", &self.fragment.as_ref().map(|(op, d)| (op, d.len())))
            .field("close_sent", &self.close_sent)
            .finish()
    }
}

impl<Role: RoleHelper> FrameCodec<Role> {
    /// Constructor, take frame size cap and size of a single read.
    pub fn new(max_frame: u64, read_chunk: usize) -> Self {
        Self::with_data(max_frame, read_chunk, Vec::new())
    }

    /// Constructor, start with bytes received before the protocol switch.
    pub fn with_data(max_frame: u64, read_chunk: usize, data: Vec<u8>) -> Self {
        Self {
            input: MessageInput::with_data(read_chunk, data),
            output: Vec::new(),
            flushed: 0,
            fragment: None,
            max_frame,
            close_sent: false,
            _marker: PhantomData,
        }
    }

    /// Whether a close frame has been queued.
    #[inline]
    pub const fn is_close_sent(&self) -> bool { self.close_sent }

    #[inline]
    pub fn has_pending(&self) -> bool { self.flushed < self.output.len() }

    /// Encoded bytes not yet accepted by the channel.
    #[inline]
    pub fn pending(&self) -> &[u8] { &self.output[self.flushed..] }

    /// Queue one final frame.
    ///
    /// Nothing can be sent after a close frame.
    pub fn transmit(&mut self, opcode: OpCode, payload: &[u8]) -> Result<(), FrameError> {
        if self.close_sent {
            return Err(FrameError::Closed);
        }
        if opcode.is_control() && payload.len() as u64 > MAX_CONTROL_SIZE {
            return Err(FrameError::ControlTooLong);
        }
        if opcode == OpCode::Close {
            self.close_sent = true;
        }

        let head = FrameHead::new(
            Fin::Y,
            opcode,
            Role::new_write_mask(),
            PayloadLen::from_num(payload.len() as u64),
        );
        head.encode_to_vec(&mut self.output);

        let start = self.output.len();
        self.output.extend_from_slice(payload);
        if let Mask::Key(key) = head.mask {
            mask::apply_mask4(key, &mut self.output[start..]);
        }
        Ok(())
    }

    /// Push queued frames into the channel.
    pub fn poll_flush<C: ByteChannel + ?Sized>(&mut self, chan: &mut C) -> Poll<Result<(), Error>> {
        while self.has_pending() {
            match chan.write(&self.output[self.flushed..]) {
                Ok(0) => {
                    return Poll::Ready(Err(Error::WriteFailed(IoError::from(
                        ErrorKind::WriteZero,
                    ))))
                }
                Ok(n) => self.flushed += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Poll::Pending,
                Err(e) => return Poll::Ready(Err(Error::WriteFailed(e))),
            }
        }
        self.output.clear();
        self.flushed = 0;
        Poll::Ready(Ok(()))
    }

    /// Decode one complete frame.
    ///
    /// Returns `None` if the peer disconnects, including in the middle of
    /// a frame.
    fn poll_frame<C: ByteChannel + ?Sized>(
        &mut self,
        chan: &mut C,
    ) -> Poll<Result<Option<(FrameHead, Vec<u8>)>, Error>> {
        loop {
            let (head, n) = match FrameHead::decode(self.input.buffered()) {
                Ok(x) => x,
                Err(FrameError::NotEnoughData) => {
                    if ready!(self.input.fill(chan))? == 0 {
                        return Poll::Ready(Ok(None));
                    }
                    continue;
                }
                Err(e) => return Poll::Ready(Err(e.into())),
            };

            let len = head.length.to_num();
            if len > self.max_frame {
                return Poll::Ready(Err(FrameError::TooLarge(len).into()));
            }
            if head.opcode.is_control() {
                if !head.fin.is_final() {
                    return Poll::Ready(Err(FrameError::FragmentedControl.into()));
                }
                if len > MAX_CONTROL_SIZE {
                    return Poll::Ready(Err(FrameError::ControlTooLong.into()));
                }
            }

            let total = match usize::try_from(len).ok().and_then(|len| len.checked_add(n)) {
                Some(total) => total,
                None => return Poll::Ready(Err(FrameError::TooLarge(len).into())),
            };
            if self.input.buffered().len() < total {
                if ready!(self.input.fill(chan))? == 0 {
                    return Poll::Ready(Ok(None));
                }
                continue;
            }

            let mut payload = self.input.buffered()[n..total].to_vec();
            self.input.consume(total);
            if let Mask::Key(key) = head.mask {
                mask::apply_mask4(key, &mut payload);
            }
            return Poll::Ready(Ok(Some((head, payload))));
        }
    }

    /// Receive the next message.
    ///
    /// Fragments are joined before the message is returned; control frames
    /// may arrive between fragments and are returned as they come.
    /// Returns `None` if the peer disconnects.
    pub fn poll_receive<C: ByteChannel + ?Sized>(
        &mut self,
        chan: &mut C,
    ) -> Poll<Result<Option<Message>, Error>> {
        loop {
            let (head, payload) = match ready!(self.poll_frame(chan))? {
                Some(frame) => frame,
                None => return Poll::Ready(Ok(None)),
            };

            let (opcode, data) = match head.opcode {
                OpCode::Close | OpCode::Ping | OpCode::Pong => {
                    return Poll::Ready(Ok(Some(Message::new(head.opcode, payload))))
                }
                OpCode::Continue => {
                    let (opcode, mut data) = self
                        .fragment
                        .take()
                        .ok_or(FrameError::UnexpectedContinuation)?;
                    data.extend_from_slice(&payload);
                    (opcode, data)
                }
                OpCode::Text | OpCode::Binary => {
                    if self.fragment.is_some() {
                        return Poll::Ready(Err(FrameError::UnfinishedMessage.into()));
                    }
                    (head.opcode, payload)
                }
            };

            if data.len() as u64 > self.max_frame {
                return Poll::Ready(Err(FrameError::TooLarge(data.len() as u64).into()));
            }

            if !head.fin.is_final() {
                self.fragment = Some((opcode, data));
                continue;
            }

            if opcode == OpCode::Text && std::str::from_utf8(&data).is_err() {
                return Poll::Ready(Err(FrameError::InvalidUtf8.into()));
            }
            return Poll::Ready(Ok(Some(Message::new(opcode, data))));
        }
    }
}
