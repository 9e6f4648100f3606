/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::pin::Pin;
use std::str::FromStr;
use std::task::{ready, Context, Poll};

use bytes::BufMut;
use http::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::AsyncBufRead;

use crate::parse::{ChunkSizeAccumulator, HttpHeaderLine, HttpLineParseError};

use super::BodyReadError;

/// Scanner position inside the chunked transfer coding.
///
/// Modes only move forward, except that a finished chunk suffix reopens
/// the prefix of the next chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkMode {
    Prefix,
    Extension,
    Data,
    Suffix,
    Trailer,
    TrailerHeaders,
    Complete,
}

pub(super) struct ChunkedState<'a> {
    mode: ChunkMode,
    chunk_remaining: u32,
    size_line: ChunkSizeAccumulator,
    /// a CR has been consumed and the matching LF is still outstanding
    pending_cr: bool,
    line_cache: Vec<u8>,
    trailer_size: usize,
    trailer_max_size: usize,
    trailers: &'a mut HeaderMap,
}

impl<'a> ChunkedState<'a> {
    pub(super) fn new(trailers: &'a mut HeaderMap, trailer_max_size: usize) -> Self {
        ChunkedState {
            mode: ChunkMode::Prefix,
            chunk_remaining: 0,
            size_line: ChunkSizeAccumulator::new(),
            pending_cr: false,
            line_cache: Vec::with_capacity(32),
            trailer_size: 0,
            trailer_max_size,
            trailers,
        }
    }

    /// Chunk-data bytes released by the caller. `n` never exceeds what the
    /// last peek handed out, so this cannot underflow.
    pub(super) fn data_consumed(&mut self, n: usize) {
        debug_assert_eq!(self.mode, ChunkMode::Data);
        self.chunk_remaining -= n as u32;
    }

    /// Drive the scanner until chunk-data bytes sit at the front of the
    /// stream buffer, or the terminal chunk and its trailers are consumed.
    ///
    /// Returns the number of data bytes available at the front of the
    /// buffer, 0 at end of body. Framing bytes are consumed here as they
    /// are scanned; data bytes are left in place for the caller.
    pub(super) fn poll_fill_data<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut stream: Pin<&mut R>,
    ) -> Poll<Result<usize, BodyReadError>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            match self.mode {
                ChunkMode::Prefix => ready!(self.poll_prefix(cx, stream.as_mut()))?,
                ChunkMode::Extension => ready!(self.poll_extension(cx, stream.as_mut()))?,
                ChunkMode::Data => {
                    if self.chunk_remaining == 0 {
                        self.mode = ChunkMode::Suffix;
                        continue;
                    }
                    let buf = ready!(stream.as_mut().poll_fill_buf(cx))?;
                    if buf.is_empty() {
                        return Poll::Ready(Err(BodyReadError::ChunkedRequestIncomplete));
                    }
                    let n = buf.len().min(self.chunk_remaining as usize);
                    return Poll::Ready(Ok(n));
                }
                ChunkMode::Suffix => ready!(self.poll_suffix(cx, stream.as_mut()))?,
                ChunkMode::Trailer => ready!(self.poll_trailer(cx, stream.as_mut()))?,
                ChunkMode::TrailerHeaders => {
                    ready!(self.poll_trailer_headers(cx, stream.as_mut()))?
                }
                ChunkMode::Complete => return Poll::Ready(Ok(0)),
            }
        }
    }

    /// Parse the chunk-size line up to its `;` or CR LF terminator.
    fn poll_prefix<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut stream: Pin<&mut R>,
    ) -> Poll<Result<(), BodyReadError>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let buf = ready!(stream.as_mut().poll_fill_buf(cx))?;
            if buf.is_empty() {
                return Poll::Ready(Err(BodyReadError::ChunkedRequestIncomplete));
            }

            if self.pending_cr {
                if buf[0] != b'\n' {
                    return Poll::Ready(Err(BodyReadError::BadChunkSizeData));
                }
                stream.as_mut().consume(1);
                self.pending_cr = false;
                let size = self
                    .size_line
                    .take()
                    .map_err(|_| BodyReadError::BadChunkSizeData)?;
                self.chunk_remaining = size;
                self.mode = if size > 0 {
                    ChunkMode::Data
                } else {
                    ChunkMode::Trailer
                };
                return Poll::Ready(Ok(()));
            }

            let mut consumed = 0;
            let mut terminator: Option<u8> = None;
            for &b in buf {
                let is_digit = self
                    .size_line
                    .feed(b)
                    .map_err(|_| BodyReadError::BadChunkSizeData)?;
                consumed += 1;
                if is_digit {
                    continue;
                }
                match b {
                    b';' | b'\r' => {
                        terminator = Some(b);
                        break;
                    }
                    _ => return Poll::Ready(Err(BodyReadError::BadChunkSizeData)),
                }
            }
            if terminator.is_some() && self.size_line.is_empty() {
                // the size line must open with at least one hex digit
                return Poll::Ready(Err(BodyReadError::BadChunkSizeData));
            }
            stream.as_mut().consume(consumed);
            match terminator {
                Some(b';') => {
                    let size = self
                        .size_line
                        .take()
                        .map_err(|_| BodyReadError::BadChunkSizeData)?;
                    self.chunk_remaining = size;
                    self.mode = ChunkMode::Extension;
                    return Poll::Ready(Ok(()));
                }
                Some(_) => {
                    // a lone CR is inconclusive until the LF shows up
                    self.pending_cr = true;
                }
                None => {}
            }
        }
    }

    /// Skip chunk-extension text up to its CR LF terminator. Extensions
    /// are not interpreted, and a CR not followed by LF stays part of the
    /// extension text.
    fn poll_extension<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut stream: Pin<&mut R>,
    ) -> Poll<Result<(), BodyReadError>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let buf = ready!(stream.as_mut().poll_fill_buf(cx))?;
            if buf.is_empty() {
                return Poll::Ready(Err(BodyReadError::ChunkedRequestIncomplete));
            }

            if self.pending_cr {
                if buf[0] == b'\n' {
                    stream.as_mut().consume(1);
                    self.pending_cr = false;
                    self.mode = if self.chunk_remaining > 0 {
                        ChunkMode::Data
                    } else {
                        ChunkMode::Trailer
                    };
                    return Poll::Ready(Ok(()));
                }
                self.pending_cr = false;
            }

            match memchr::memchr(b'\r', buf) {
                Some(p) => {
                    stream.as_mut().consume(p + 1);
                    self.pending_cr = true;
                }
                None => {
                    let len = buf.len();
                    stream.as_mut().consume(len);
                }
            }
        }
    }

    /// Expect exactly CR LF after the chunk data, then reopen the next
    /// chunk prefix.
    fn poll_suffix<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut stream: Pin<&mut R>,
    ) -> Poll<Result<(), BodyReadError>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let buf = ready!(stream.as_mut().poll_fill_buf(cx))?;
            if buf.is_empty() {
                return Poll::Ready(Err(BodyReadError::ChunkedRequestIncomplete));
            }

            if self.pending_cr {
                if buf[0] != b'\n' {
                    return Poll::Ready(Err(BodyReadError::BadChunkSuffix));
                }
                stream.as_mut().consume(1);
                self.pending_cr = false;
                self.mode = ChunkMode::Prefix;
                return Poll::Ready(Ok(()));
            }

            if buf[0] != b'\r' {
                return Poll::Ready(Err(BodyReadError::BadChunkSuffix));
            }
            if buf.len() == 1 {
                stream.as_mut().consume(1);
                self.pending_cr = true;
                continue;
            }
            if buf[1] != b'\n' {
                return Poll::Ready(Err(BodyReadError::BadChunkSuffix));
            }
            stream.as_mut().consume(2);
            self.mode = ChunkMode::Prefix;
            return Poll::Ready(Ok(()));
        }
    }

    /// After the zero-sized chunk: CR LF ends the body with no trailers,
    /// anything else is left in place for trailer-header parsing.
    fn poll_trailer<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut stream: Pin<&mut R>,
    ) -> Poll<Result<(), BodyReadError>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let buf = ready!(stream.as_mut().poll_fill_buf(cx))?;
            if buf.is_empty() {
                return Poll::Ready(Err(BodyReadError::ChunkedRequestIncomplete));
            }

            if self.pending_cr {
                if buf[0] != b'\n' {
                    // a trailer section may not open with a bare CR
                    return Poll::Ready(Err(BodyReadError::InvalidTrailerLine(
                        HttpLineParseError::InvalidLineEnding,
                    )));
                }
                stream.as_mut().consume(1);
                self.pending_cr = false;
                self.mode = ChunkMode::Complete;
                return Poll::Ready(Ok(()));
            }

            if buf[0] != b'\r' {
                self.mode = ChunkMode::TrailerHeaders;
                return Poll::Ready(Ok(()));
            }
            if buf.len() == 1 {
                stream.as_mut().consume(1);
                self.pending_cr = true;
                continue;
            }
            if buf[1] != b'\n' {
                return Poll::Ready(Err(BodyReadError::InvalidTrailerLine(
                    HttpLineParseError::InvalidLineEnding,
                )));
            }
            stream.as_mut().consume(2);
            self.mode = ChunkMode::Complete;
            return Poll::Ready(Ok(()));
        }
    }

    /// Parse trailer field lines and append them to the request headers,
    /// until the empty line that ends the trailer section.
    fn poll_trailer_headers<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut stream: Pin<&mut R>,
    ) -> Poll<Result<(), BodyReadError>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let buf = ready!(stream.as_mut().poll_fill_buf(cx))?;
            if buf.is_empty() {
                return Poll::Ready(Err(BodyReadError::ChunkedRequestIncomplete));
            }

            let Some(p) = memchr::memchr(b'\n', buf) else {
                let len = buf.len();
                self.trailer_size += len;
                if self.trailer_size > self.trailer_max_size {
                    return Poll::Ready(Err(BodyReadError::TrailerTooLarge(
                        self.trailer_max_size,
                    )));
                }
                self.line_cache.put_slice(buf);
                stream.as_mut().consume(len);
                continue;
            };

            self.trailer_size += p + 1;
            if self.trailer_size > self.trailer_max_size {
                return Poll::Ready(Err(BodyReadError::TrailerTooLarge(self.trailer_max_size)));
            }
            self.line_cache.put_slice(&buf[0..=p]);
            stream.as_mut().consume(p + 1);

            self.take_trailer_line()?;
            if self.mode == ChunkMode::Complete {
                return Poll::Ready(Ok(()));
            }
        }
    }

    /// One complete line sits in the cache, terminator included.
    fn take_trailer_line(&mut self) -> Result<(), BodyReadError> {
        let line = self.line_cache.as_slice();
        let len = line.len();
        // bare LF line endings are not accepted
        if len < 2 || line[len - 2] != b'\r' {
            return Err(BodyReadError::InvalidTrailerLine(
                HttpLineParseError::InvalidLineEnding,
            ));
        }
        let line = &line[..len - 2];
        if line.is_empty() {
            self.mode = ChunkMode::Complete;
            self.line_cache.clear();
            return Ok(());
        }

        let header = HttpHeaderLine::parse(line)?;
        let name = HeaderName::from_str(header.name).map_err(|_| {
            BodyReadError::InvalidTrailerLine(HttpLineParseError::InvalidHeaderName)
        })?;
        let value = HeaderValue::from_str(header.value).map_err(|_| {
            BodyReadError::InvalidTrailerLine(HttpLineParseError::InvalidHeaderValue)
        })?;
        self.trailers.append(name, value);
        self.line_cache.clear();
        Ok(())
    }
}
