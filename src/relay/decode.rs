//! Upstream body buffering and gzip decoding.

use std::io::Read;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use flate2::read::MultiGzDecoder;

use crate::relay::error::RelayError;

/// How the upstream body is encoded, from `Content-Encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// No header, or `identity`.
    Identity,
    Gzip,
    /// Anything else (`br`, `deflate`, stacked codings). Never decoded.
    Other,
}

impl BodyEncoding {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = headers.get_all(header::CONTENT_ENCODING).iter();
        let Some(first) = values.next() else {
            return BodyEncoding::Identity;
        };
        if values.next().is_some() {
            return BodyEncoding::Other;
        }

        match first.to_str().map(str::trim) {
            Ok(v) if v.is_empty() || v.eq_ignore_ascii_case("identity") => BodyEncoding::Identity,
            Ok(v) if v.eq_ignore_ascii_case("gzip") => BodyEncoding::Gzip,
            _ => BodyEncoding::Other,
        }
    }
}

/// A fully buffered upstream response.
#[derive(Debug)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Read the whole upstream body, reversing gzip if declared.
///
/// When the body was gzip, `Content-Encoding` is removed from the returned
/// headers since the bytes are now plain.
pub async fn buffer_response(response: reqwest::Response) -> Result<BufferedResponse, RelayError> {
    let status = response.status();
    let mut headers = response.headers().clone();
    let encoding = BodyEncoding::from_headers(&headers);

    let raw = response.bytes().await.map_err(RelayError::BodyRead)?;

    let body = match encoding {
        BodyEncoding::Gzip => {
            let decoded = gunzip(&raw)?;
            headers.remove(header::CONTENT_ENCODING);
            tracing::debug!(
                compressed = raw.len(),
                decoded = decoded.len(),
                "Decoded gzip body"
            );
            Bytes::from(decoded)
        }
        BodyEncoding::Identity | BodyEncoding::Other => raw,
    };

    Ok(BufferedResponse {
        status,
        headers,
        body,
    })
}

/// Decompress a complete gzip stream (multi-member streams included).
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, RelayError> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(RelayError::Decode)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn with_encoding(values: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for v in values {
            headers.append(header::CONTENT_ENCODING, HeaderValue::from_static(*v));
        }
        headers
    }

    #[test]
    fn encoding_detection() {
        assert_eq!(BodyEncoding::from_headers(&HeaderMap::new()), BodyEncoding::Identity);
        assert_eq!(BodyEncoding::from_headers(&with_encoding(&["identity"])), BodyEncoding::Identity);
        assert_eq!(BodyEncoding::from_headers(&with_encoding(&["gzip"])), BodyEncoding::Gzip);
        assert_eq!(BodyEncoding::from_headers(&with_encoding(&["GZIP "])), BodyEncoding::Gzip);
        assert_eq!(BodyEncoding::from_headers(&with_encoding(&["br"])), BodyEncoding::Other);
        assert_eq!(
            BodyEncoding::from_headers(&with_encoding(&["gzip", "br"])),
            BodyEncoding::Other
        );
    }

    #[test]
    fn gunzip_round_trip() {
        let html = b"<a href=\"/x\">x</a>";
        assert_eq!(gunzip(&gzip(html)).unwrap(), html);
    }

    #[test]
    fn gunzip_concatenated_members() {
        let mut data = gzip(b"#EXTM3U\n");
        data.extend(gzip(b"/seg1.ts\n"));
        assert_eq!(gunzip(&data).unwrap(), b"#EXTM3U\n/seg1.ts\n");
    }

    #[test]
    fn corrupt_stream_is_decode_error() {
        assert!(matches!(gunzip(b"not gzip at all"), Err(RelayError::Decode(_))));

        let mut truncated = gzip(b"some longer body that will be cut short");
        truncated.truncate(truncated.len() - 4);
        assert!(matches!(gunzip(&truncated), Err(RelayError::Decode(_))));
    }
}
