/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use http::HeaderMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::chunked::ChunkedState;
use super::{BodyFraming, BodyReadError, BodySelection, FrameControl};

enum FramingState<'a> {
    UntilClose,
    FixedLength { remaining: u64 },
    Chunked(ChunkedState<'a>),
}

/// Pull-based reader for one request message body.
///
/// The reader scans framing bytes (chunk-size lines, extensions, CR LF
/// suffixes, trailers) out of the stream as it goes, but leaves payload
/// bytes buffered until the caller has taken them. An application that
/// stops reading therefore stops the transport as well.
///
/// Created once per request after the header section, used until the body
/// is exhausted or rejected, then discarded. Any error is terminal for the
/// reader.
pub struct RequestBodyReader<'a, R, C> {
    stream: &'a mut R,
    control: C,
    framing: FramingState<'a>,
    keep_alive: bool,
    continue_pending: bool,
    failed: bool,
    finished: bool,
}

impl<'a, R, C> RequestBodyReader<'a, R, C>
where
    R: AsyncBufRead + Unpin,
    C: FrameControl,
{
    fn with_framing(
        stream: &'a mut R,
        control: C,
        framing: FramingState<'a>,
        keep_alive: bool,
    ) -> Self {
        RequestBodyReader {
            stream,
            control,
            framing,
            keep_alive,
            continue_pending: true,
            failed: false,
            finished: false,
        }
    }

    /// Build the reader matching a framing selection. The trailer borrow
    /// is only held onto for chunked framing.
    pub fn new(
        stream: &'a mut R,
        control: C,
        selection: BodySelection,
        trailers: &'a mut HeaderMap,
        trailer_max_size: usize,
    ) -> Self {
        let framing = match selection.framing {
            BodyFraming::UntilClose => FramingState::UntilClose,
            BodyFraming::FixedLength(len) => FramingState::FixedLength { remaining: len },
            BodyFraming::Chunked => {
                FramingState::Chunked(ChunkedState::new(trailers, trailer_max_size))
            }
        };
        Self::with_framing(stream, control, framing, selection.keep_alive)
    }

    pub fn new_until_close(stream: &'a mut R, control: C) -> Self {
        Self::with_framing(stream, control, FramingState::UntilClose, false)
    }

    pub fn new_fixed_length(stream: &'a mut R, control: C, content_length: u64) -> Self {
        Self::with_framing(
            stream,
            control,
            FramingState::FixedLength {
                remaining: content_length,
            },
            true,
        )
    }

    pub fn new_chunked(
        stream: &'a mut R,
        control: C,
        trailers: &'a mut HeaderMap,
        trailer_max_size: usize,
    ) -> Self {
        Self::with_framing(
            stream,
            control,
            FramingState::Chunked(ChunkedState::new(trailers, trailer_max_size)),
            true,
        )
    }

    /// Whether the connection may serve another request once this body has
    /// been consumed.
    #[inline]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Whether the end of the body has been observed.
    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Read the next body bytes into `dst`. Returns 0 at end of body.
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<usize, BodyReadError> {
        let n = poll_fn(|cx| self.poll_fill_payload(cx)).await?;
        if n == 0 || dst.is_empty() {
            return Ok(0);
        }
        let take = n.min(dst.len());
        // the payload is buffered now, this returns without waiting
        let buf = self.stream.fill_buf().await?;
        dst[..take].copy_from_slice(&buf[..take]);
        self.advance(take);
        Ok(take)
    }

    /// Stream the whole body into `sink`, straight out of the stream
    /// buffer.
    ///
    /// Bytes handed to a failing sink still count as consumed, they are
    /// never delivered twice.
    pub async fn copy_to<W>(&mut self, sink: &mut W) -> Result<(), BodyReadError>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            let n = poll_fn(|cx| self.poll_fill_payload(cx)).await?;
            if n == 0 {
                return Ok(());
            }
            let buf = self.stream.fill_buf().await?;
            let ret = sink.write_all(&buf[..n]).await;
            self.advance(n);
            ret.map_err(BodyReadError::SinkWriteFailed)?;
        }
    }

    /// Consume and discard the rest of the body, trailers included, so the
    /// connection is positioned at the first byte of the next request.
    pub async fn drain(&mut self) -> Result<(), BodyReadError> {
        loop {
            let n = poll_fn(|cx| self.poll_fill_payload(cx)).await?;
            if n == 0 {
                return Ok(());
            }
            self.advance(n);
        }
    }

    /// Drive framing until payload bytes sit at the front of the stream
    /// buffer. Returns the payload length available there, 0 at end of
    /// body. Waiting for the transport triggers the interim response once.
    fn poll_fill_payload(&mut self, cx: &mut Context<'_>) -> Poll<Result<usize, BodyReadError>> {
        if self.failed {
            return Poll::Ready(Err(BodyReadError::ReadFailed(io::Error::other(
                "body reader is unusable after a failed read",
            ))));
        }
        let poll = self.poll_peek(cx);
        match &poll {
            Poll::Pending => {
                if self.continue_pending {
                    self.continue_pending = false;
                    self.control.produce_continue();
                }
            }
            Poll::Ready(Ok(0)) => self.finished = true,
            Poll::Ready(Err(_)) => self.failed = true,
            Poll::Ready(Ok(_)) => {}
        }
        poll
    }

    fn poll_peek(&mut self, cx: &mut Context<'_>) -> Poll<Result<usize, BodyReadError>> {
        match &mut self.framing {
            FramingState::UntilClose => {
                // an empty buffer at close is the end of the body
                let buf = ready!(Pin::new(&mut *self.stream).poll_fill_buf(cx))?;
                Poll::Ready(Ok(buf.len()))
            }
            FramingState::FixedLength { remaining } => {
                if *remaining == 0 {
                    return Poll::Ready(Ok(0));
                }
                let buf = ready!(Pin::new(&mut *self.stream).poll_fill_buf(cx))?;
                if buf.is_empty() {
                    return Poll::Ready(Err(BodyReadError::UnexpectedEndOfRequestContent));
                }
                let n = (buf.len() as u64).min(*remaining) as usize;
                Poll::Ready(Ok(n))
            }
            FramingState::Chunked(chunked) => {
                chunked.poll_fill_data(cx, Pin::new(&mut *self.stream))
            }
        }
    }

    /// The single write path into the stream: release `n` payload bytes
    /// and run the framing arithmetic.
    fn advance(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        Pin::new(&mut *self.stream).consume(n);
        match &mut self.framing {
            FramingState::UntilClose => {}
            FramingState::FixedLength { remaining } => *remaining -= n as u64,
            FramingState::Chunked(chunked) => chunked.data_consumed(n),
        }
    }
}
