/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::HttpLineParseError;

pub struct HttpHeaderLine<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> HttpHeaderLine<'a> {
    /// Split one header field line on its first ':'.
    ///
    /// The caller strips the line terminator before handing the line in.
    pub fn parse(buf: &'a [u8]) -> Result<HttpHeaderLine<'a>, HttpLineParseError> {
        let line = std::str::from_utf8(buf)?;
        let Some(p) = memchr::memchr(b':', line.as_bytes()) else {
            return Err(HttpLineParseError::NoDelimiterFound(':'));
        };

        let name = line[0..p].trim();
        if name.is_empty() {
            return Err(HttpLineParseError::InvalidHeaderName);
        }
        let value = line[p + 1..].trim();

        Ok(HttpHeaderLine { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple() {
        let header = HttpHeaderLine::parse(b"Host: example.com").unwrap();
        assert_eq!(header.name, "Host");
        assert_eq!(header.value, "example.com");

        let header = HttpHeaderLine::parse(b"X-Empty:").unwrap();
        assert_eq!(header.name, "X-Empty");
        assert_eq!(header.value, "");
    }

    #[test]
    fn no_delimiter() {
        assert!(HttpHeaderLine::parse(b"no colon here").is_err());
    }

    #[test]
    fn empty_name() {
        assert!(HttpHeaderLine::parse(b": value").is_err());
    }
}
