//! Test fixtures: bundle trees, keys and multipart parsing.

use std::path::Path;
use updraft_signer::PublicKey;

/// Runtime version of the standard fixture bundle.
pub const RUNTIME_VERSION: &str = "5";

/// Publish timestamp of the standard fixture bundle.
pub const PUBLISH_TIMESTAMP: &str = "1700000000";

/// `metadata.json` of the standard fixture bundle: android only, one image asset.
pub const ANDROID_METADATA: &str = r#"{"version":0,"bundler":"metro","fileMetadata":{"android":{"bundle":"index.js","assets":[{"path":"a.png","ext":"png"}]}}}"#;

/// App config document of the standard fixture bundle.
pub const APP_CONFIG: &str = r#"{"name":"updraft-demo","slug":"updraft-demo","version":"1.0.0"}"#;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/private-key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/public-key.pem");

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(&path, contents).expect("Failed to write fixture file");
}

/// Publish a bundle with the standard android fixture content.
#[allow(dead_code)]
pub fn write_android_bundle(root: &Path, runtime_version: &str, timestamp: &str) {
    let dir = format!("{runtime_version}/{timestamp}");
    write_file(root, &format!("{dir}/metadata.json"), ANDROID_METADATA);
    write_file(root, &format!("{dir}/expoConfig.json"), APP_CONFIG);
    write_file(root, &format!("{dir}/a.png"), b"\x89PNG fixture image");
    write_file(root, &format!("{dir}/index.js"), "console.log('hello from 1700000000');");
}

/// Publish a rollback bundle.
#[allow(dead_code)]
pub fn write_rollback_bundle(root: &Path, runtime_version: &str, timestamp: &str) {
    let dir = format!("{runtime_version}/{timestamp}");
    write_file(root, &format!("{dir}/metadata.json"), "{}");
    write_file(root, &format!("{dir}/rollback"), "");
}

/// Public half of the fixture signing key.
#[allow(dead_code)]
pub fn test_public_key() -> PublicKey {
    PublicKey::from_pem(TEST_PUBLIC_KEY).expect("Failed to parse fixture public key")
}

/// One part of a `multipart/mixed` response.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ParsedPart {
    pub name: String,
    pub content_type: String,
    pub signature: Option<String>,
    pub body: String,
}

/// Extract the boundary from a `multipart/mixed` content type.
pub fn boundary_of(content_type: &str) -> &str {
    content_type
        .split(';')
        .find_map(|param| param.trim().strip_prefix("boundary="))
        .expect("content type has no boundary")
}

/// Split a `multipart/mixed` body into its parts.
pub fn parse_multipart(content_type: &str, body: &str) -> Vec<ParsedPart> {
    let delimiter = format!("--{}", boundary_of(content_type));
    let mut parts = Vec::new();

    for segment in body.split(delimiter.as_str()).skip(1) {
        if segment.starts_with("--") {
            break;
        }
        let segment = segment.strip_prefix("\r\n").expect("delimiter not followed by CRLF");
        let (head, rest) = segment.split_once("\r\n\r\n").expect("part has no header block");
        let body = rest.strip_suffix("\r\n").expect("part body not CRLF-terminated");

        let mut name = None;
        let mut content_type = None;
        let mut signature = None;
        for line in head.split("\r\n") {
            let (key, value) = line.split_once(": ").expect("malformed part header");
            match key {
                "content-disposition" => {
                    name = value
                        .split_once("name=\"")
                        .and_then(|(_, rest)| rest.strip_suffix('"'))
                        .map(str::to_string);
                }
                "content-type" => content_type = Some(value.to_string()),
                "expo-signature" => signature = Some(value.to_string()),
                other => panic!("unexpected part header {other}"),
            }
        }

        parts.push(ParsedPart {
            name: name.expect("part has no name"),
            content_type: content_type.expect("part has no content type"),
            signature,
            body: body.to_string(),
        });
    }

    parts
}
