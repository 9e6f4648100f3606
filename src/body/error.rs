/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::HttpLineParseError;

/// Errors surfaced while framing and delivering a request message body.
///
/// Protocol violations are terminal for the request: the reader refuses
/// further reads and the connection layer answers with the status from
/// [`status_code`](BodyReadError::status_code) before closing. Transport
/// and sink faults carry no status, the connection is simply aborted.
#[derive(Debug, Error)]
pub enum BodyReadError {
    #[error("read failed: {0:?}")]
    ReadFailed(#[from] io::Error),
    #[error("sink write failed: {0:?}")]
    SinkWriteFailed(io::Error),
    #[error("invalid content-length header")]
    InvalidContentLength,
    #[error("unexpected end of request content")]
    UnexpectedEndOfRequestContent,
    #[error("incomplete chunked request body")]
    ChunkedRequestIncomplete,
    #[error("bad chunk suffix")]
    BadChunkSuffix,
    #[error("bad chunk size data")]
    BadChunkSizeData,
    #[error("invalid trailer line: {0}")]
    InvalidTrailerLine(#[from] HttpLineParseError),
    #[error("trailer section too large (> {0})")]
    TrailerTooLarge(usize),
}

impl BodyReadError {
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            BodyReadError::ReadFailed(_) | BodyReadError::SinkWriteFailed(_) => None,
            BodyReadError::TrailerTooLarge(_) => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            _ => Some(StatusCode::BAD_REQUEST),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code() {
        let io_err = io::Error::other("test error");
        assert_eq!(BodyReadError::ReadFailed(io_err).status_code(), None);
        let io_err = io::Error::other("test error");
        assert_eq!(BodyReadError::SinkWriteFailed(io_err).status_code(), None);

        assert_eq!(
            BodyReadError::TrailerTooLarge(1024).status_code(),
            Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
        );

        assert_eq!(
            BodyReadError::InvalidContentLength.status_code(),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            BodyReadError::UnexpectedEndOfRequestContent.status_code(),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            BodyReadError::ChunkedRequestIncomplete.status_code(),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            BodyReadError::BadChunkSuffix.status_code(),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            BodyReadError::BadChunkSizeData.status_code(),
            Some(StatusCode::BAD_REQUEST)
        );
    }
}
