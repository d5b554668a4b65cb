//! `multipart/mixed` encoding of protocol responses.

use crate::error::{ApiError, ApiResult};
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use updraft_core::ProtocolVersion;
use uuid::Uuid;

/// Content type of every part body.
pub const PART_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Per-part header carrying the structured-field signature.
pub const SIGNATURE_HEADER: &str = "expo-signature";

/// One named JSON part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub name: &'static str,
    pub body: String,
    /// Signature header value covering exactly `body`.
    pub signature: Option<String>,
}

/// A `multipart/mixed` body assembled fully in memory.
#[derive(Clone, Debug)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Start an empty body with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("updraft-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part.
    pub fn part(mut self, name: &'static str, body: String, signature: Option<String>) -> Self {
        self.parts.push(Part {
            name,
            body,
            signature,
        });
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Value of the outer `content-type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    /// Encode all parts followed by the closing delimiter.
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        for part in &self.parts {
            out.put_slice(b"--");
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(b"\r\n");
            out.put_slice(
                format!("content-disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            );
            out.put_slice(format!("content-type: {PART_CONTENT_TYPE}\r\n").as_bytes());
            if let Some(signature) = &part.signature {
                out.put_slice(format!("{SIGNATURE_HEADER}: {signature}\r\n").as_bytes());
            }
            out.put_slice(b"\r\n");
            out.put_slice(part.body.as_bytes());
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"--");
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(b"--\r\n");
        out.freeze()
    }
}

/// Wrap an encoded body with the protocol response headers.
///
/// Fails when the boundary cannot be carried in a header value.
pub fn protocol_response(protocol: ProtocolVersion, body: MultipartBody) -> ApiResult<Response> {
    let content_type = HeaderValue::from_str(&body.content_type())
        .map_err(|e| ApiError::Internal(format!("invalid multipart boundary: {e}")))?;

    let mut response = (StatusCode::OK, Body::from(body.encode())).into_response();
    let headers = response.headers_mut();
    headers.insert(
        "expo-protocol-version",
        HeaderValue::from(protocol.as_u32()),
    );
    headers.insert("expo-sfv-version", HeaderValue::from_static("0"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("private, max-age=0"));
    headers.insert(CONTENT_TYPE, content_type);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_signed_part() {
        let body = MultipartBody::with_boundary("b0undary").part(
            "directive",
            r#"{"type":"noUpdateAvailable"}"#.to_string(),
            Some(r#"sig="abc", keyid="main""#.to_string()),
        );

        let expected = concat!(
            "--b0undary\r\n",
            "content-disposition: form-data; name=\"directive\"\r\n",
            "content-type: application/json; charset=utf-8\r\n",
            "expo-signature: sig=\"abc\", keyid=\"main\"\r\n",
            "\r\n",
            "{\"type\":\"noUpdateAvailable\"}\r\n",
            "--b0undary--\r\n",
        );
        assert_eq!(body.encode(), Bytes::from_static(expected.as_bytes()));
    }

    #[test]
    fn test_encode_unsigned_parts() {
        let body = MultipartBody::with_boundary("xyz")
            .part("manifest", "{}".to_string(), None)
            .part("extensions", r#"{"assetRequestHeaders":{}}"#.to_string(), None);

        let encoded = String::from_utf8(body.encode().to_vec()).unwrap();
        assert!(!encoded.contains(SIGNATURE_HEADER));
        assert_eq!(encoded.matches("--xyz\r\n").count(), 2);
        assert!(encoded.ends_with("--xyz--\r\n"));
        assert_eq!(body.content_type(), "multipart/mixed; boundary=xyz");
    }

    #[test]
    fn test_random_boundaries_differ() {
        assert_ne!(MultipartBody::new().boundary(), MultipartBody::new().boundary());
    }

    #[test]
    fn test_protocol_headers() {
        let response = protocol_response(
            ProtocolVersion::V1,
            MultipartBody::with_boundary("b").part("manifest", "{}".to_string(), None),
        )
        .unwrap();
        let headers = response.headers();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(headers["expo-protocol-version"], "1");
        assert_eq!(headers["expo-sfv-version"], "0");
        assert_eq!(headers[CACHE_CONTROL], "private, max-age=0");
        assert_eq!(headers[CONTENT_TYPE], "multipart/mixed; boundary=b");
    }

    #[test]
    fn test_unencodable_boundary_fails() {
        let body = MultipartBody::with_boundary("bad\nboundary")
            .part("manifest", "{}".to_string(), None);
        let err = protocol_response(ProtocolVersion::V0, body).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status_code().as_u16(), 500);
    }
}
