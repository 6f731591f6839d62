//! Synthetic response assembly.
//!
//! Small text payloads generated at build time — checksum stubs and the
//! TSV url-list manifest — that the reverse proxy later embeds directly in
//! its configuration as inline responses.

use crate::error::{ErrorKind, Result};
use crate::group::FileGroup;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// A virtual file served by the reverse proxy.
///
/// Not an HTTP response: the content is escaped so it can be injected into
/// a `return 200 "..."` directive inside the proxy configuration
/// (backslash, quote, dollar, newline and tab are escaped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResponse {
    pub url: String,
    pub content: String,
}

impl FileResponse {
    pub fn new(url: impl Into<String>, content: impl AsRef<str>) -> Result<Self> {
        let url = url.into();
        if !url.starts_with('/') {
            exn::bail!(ErrorKind::InvalidUrl(url));
        }
        // Escape order matters: backslashes first.
        let content = content
            .as_ref()
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('\n', "\\n")
            .replace('\t', "\\t");
        Ok(Self { url, content })
    }
}

impl FileGroup {
    /// Builds the TSV url-list manifest for this group's latest file.
    ///
    /// Format follows the "TsvHttpData-1.0" specification:
    ///
    /// ```text
    /// TsvHttpData-1.0
    /// <url>\t<size>\t<base64url(md5)>
    /// ```
    ///
    /// Fails naming the group when no latest file has been assigned — an
    /// empty manifest is never produced.
    pub fn url_list_response(&self, base_url: &str) -> Result<FileResponse> {
        let file = match &self.latest {
            Some(file) => file,
            None => exn::bail!(ErrorKind::NoLatestFile(self.slug.clone())),
        };
        let absolute = join_url(base_url, &file.url);
        FileResponse::new(
            format!("/urllist_{}.tsv", self.slug),
            format!("TsvHttpData-1.0\n{}\t{}\t{}\n", absolute, file.size, hex2base64url(file.md5()?)?),
        )
    }

    /// Returns all virtual responses associated with this group:
    ///
    /// - `.md5` and `.sha256` checksum stubs for all versions
    /// - the url-list manifest (`/urllist_<slug>.tsv`) for the latest version
    pub fn responses(&self, base_url: &str) -> Result<Vec<FileResponse>> {
        let mut responses = Vec::with_capacity(self.older.len() * 2 + 3);
        for file in &self.older {
            responses.push(file.md5_stub()?);
            responses.push(file.sha256_stub()?);
        }
        if let Some(latest) = &self.latest {
            responses.push(latest.md5_stub()?);
            responses.push(latest.sha256_stub()?);
            responses.push(self.url_list_response(base_url)?);
        }
        Ok(responses)
    }
}

/// Joins a base URL and an absolute path into one absolute URL.
fn join_url(base_url: &str, url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), url)
}

/// Converts a hexadecimal hash into base64url with '=' padding.
///
/// The manifest format requires padded base64url; encoders usually omit the
/// padding, so it is re-added to a multiple-of-4 length here.
pub fn hex2base64url(hex: &str) -> Result<String> {
    let bytes = hex::decode(hex).map_err(|_| exn::Exn::from(ErrorKind::InvalidHex(hex.to_string())))?;
    let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
    while encoded.len() % 4 != 0 {
        encoded.push('=');
    }
    Ok(encoded)
}
