/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use http::{header, HeaderMap, Version};

use super::BodyReadError;

/// How the request message body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// The body is the remainder of the connection, until the peer closes.
    UntilClose,
    /// Exactly this many payload bytes follow the header section.
    FixedLength(u64),
    /// Chunked transfer coding, optionally followed by trailer fields.
    Chunked,
}

/// Framing verdict for one request: how the body is delimited, and whether
/// the connection may be reused once the body has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySelection {
    pub framing: BodyFraming,
    pub keep_alive: bool,
}

impl BodySelection {
    /// Select body framing from the request version and header section.
    ///
    /// An upgraded connection takes the rest of the stream as body.
    /// Transfer-Encoding wins over Content-Length when both are present,
    /// no matter their order in the message. A missing length means an
    /// empty body.
    ///
    /// The Connection value is compared as a single token, so a list value
    /// such as `keep-alive, Upgrade` counts as not keep-alive.
    pub fn from_request(version: Version, headers: &HeaderMap) -> Result<Self, BodyReadError> {
        let mut keep_alive = version != Version::HTTP_10;

        if let Some(v) = headers.get(header::CONNECTION) {
            if !v.is_empty() {
                // a value outside visible ascii can never match either token
                let token = v.to_str().unwrap_or("").trim();
                if token.eq_ignore_ascii_case("upgrade") {
                    return Ok(BodySelection {
                        framing: BodyFraming::UntilClose,
                        keep_alive: false,
                    });
                }
                keep_alive = token.eq_ignore_ascii_case("keep-alive");
            }
        }

        if let Some(v) = headers.get(header::TRANSFER_ENCODING) {
            if !v.is_empty() {
                return Ok(BodySelection {
                    framing: BodyFraming::Chunked,
                    keep_alive,
                });
            }
        }

        if let Some(v) = headers.get(header::CONTENT_LENGTH) {
            if !v.is_empty() {
                let len = parse_content_length(v.as_bytes())?;
                return Ok(BodySelection {
                    framing: BodyFraming::FixedLength(len),
                    keep_alive,
                });
            }
        }

        Ok(BodySelection {
            framing: BodyFraming::FixedLength(0),
            keep_alive,
        })
    }
}

/// Digits-only decimal parse. Sign characters are not part of the header
/// grammar, so `+5` and `-1` both fail here where `u64::from_str` would
/// accept the former.
fn parse_content_length(value: &[u8]) -> Result<u64, BodyReadError> {
    let mut len: u64 = 0;
    for &b in value {
        if !b.is_ascii_digit() {
            return Err(BodyReadError::InvalidContentLength);
        }
        len = len
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as u64))
            .ok_or(BodyReadError::InvalidContentLength)?;
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn defaults_by_version() {
        let selection = BodySelection::from_request(Version::HTTP_11, &HeaderMap::new()).unwrap();
        assert_eq!(selection.framing, BodyFraming::FixedLength(0));
        assert!(selection.keep_alive);

        let selection = BodySelection::from_request(Version::HTTP_10, &HeaderMap::new()).unwrap();
        assert_eq!(selection.framing, BodyFraming::FixedLength(0));
        assert!(!selection.keep_alive);
    }

    #[test]
    fn connection_header() {
        let map = headers(&[("connection", "Keep-Alive")]);
        let selection = BodySelection::from_request(Version::HTTP_10, &map).unwrap();
        assert!(selection.keep_alive);

        let map = headers(&[("connection", "close")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert!(!selection.keep_alive);

        // the single-token comparison treats a list value as not keep-alive
        let map = headers(&[("connection", "keep-alive, Upgrade")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert!(!selection.keep_alive);
    }

    #[test]
    fn upgraded_connection() {
        let map = headers(&[("connection", "Upgrade")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert_eq!(selection.framing, BodyFraming::UntilClose);
        assert!(!selection.keep_alive);
    }

    #[test]
    fn transfer_encoding_wins_over_content_length() {
        let map = headers(&[("transfer-encoding", "chunked"), ("content-length", "12")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert_eq!(selection.framing, BodyFraming::Chunked);
        assert!(selection.keep_alive);

        let map = headers(&[("content-length", "12"), ("transfer-encoding", "chunked")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert_eq!(selection.framing, BodyFraming::Chunked);
    }

    #[test]
    fn content_length() {
        let map = headers(&[("content-length", "5")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert_eq!(selection.framing, BodyFraming::FixedLength(5));

        let map = headers(&[("content-length", "0")]);
        let selection = BodySelection::from_request(Version::HTTP_11, &map).unwrap();
        assert_eq!(selection.framing, BodyFraming::FixedLength(0));
        assert!(selection.keep_alive);
    }

    #[test]
    fn invalid_content_length() {
        for value in ["abc", "-1", "+5", "1 2", "18446744073709551616"] {
            let map = headers(&[("content-length", value)]);
            let r = BodySelection::from_request(Version::HTTP_11, &map);
            assert!(
                matches!(r, Err(BodyReadError::InvalidContentLength)),
                "value {value:?} should be rejected"
            );
        }
    }
}
