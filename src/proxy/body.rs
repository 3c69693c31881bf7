/* STATIC Proxy (AGPL-3.0)

Copyright (C) 2025 - 404 Contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

*/

use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use brotli::Decompressor;
use encoding_rs::{Encoding, UTF_8};
use flate2::read::{GzDecoder, ZlibDecoder};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue};

use crate::utils::error::{InjectError, InjectResult};

use super::flow::ResponseParts;

/// How far into a document `<meta charset>` declarations are looked for.
const META_SNIFF_LIMIT: usize = 1024;

/// A response body turned into text, plus the charset it was read with.
#[derive(Debug)]
pub struct BodyText {
    pub text: String,
    pub charset: &'static Encoding,
}

/// Produces the response body as text, undoing any `Content-Encoding` first.
///
/// The charset comes from the `Content-Type` header, then from a `<meta>` declaration near
/// the top of HTML bodies, and defaults to UTF-8. Returns `InjectError::Decode` when the
/// body is not valid in that charset; callers treat that as "not a document" rather than
/// a failure of the flow.
pub fn decoded_text(response: &ResponseParts) -> InjectResult<BodyText> {
    let encodings = content_encodings(&response.headers);
    let raw = response.body.as_bytes();

    let decoded = if encodings.is_empty() {
        raw.to_vec()
    } else {
        let mut decoded = raw.to_vec();
        for encoding in encodings.iter().rev() {
            decoded = match encoding.as_str() {
                "gzip" | "x-gzip" => decode_gzip(&decoded)?,
                "deflate" => decode_deflate(&decoded)?,
                "br" => decode_brotli(&decoded)?,
                other => {
                    return Err(InjectError::Decode(format!(
                        "unsupported content-encoding: {other}"
                    )))
                }
            };
        }
        decoded
    };

    let charset = response_charset(&response.headers, &decoded);
    let text = charset
        .decode_without_bom_handling_and_without_replacement(&decoded)
        .ok_or_else(|| InjectError::Decode(format!("body is not valid {}", charset.name())))?;

    Ok(BodyText {
        text: text.into_owned(),
        charset,
    })
}

/// Replaces the response body with UTF-8 text and fixes the framing headers to match.
///
/// `source` is the charset the body was read with; when it was not UTF-8 the
/// `Content-Type` charset is rewritten so the client decodes the new bytes correctly.
pub fn store_plain_body(
    response: &mut ResponseParts,
    body: &str,
    source: &'static Encoding,
) -> Result<()> {
    response.body.replace(body.as_bytes());
    response.headers.remove(CONTENT_ENCODING);
    response.headers.remove(TRANSFER_ENCODING);
    let len_value = HeaderValue::from_str(&response.body.len().to_string())
        .context("invalid content-length after body rewrite")?;
    response.headers.insert(CONTENT_LENGTH, len_value);
    mark_utf8(&mut response.headers, source)
}

fn response_charset(headers: &HeaderMap, body: &[u8]) -> &'static Encoding {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if let Some(encoding) =
        charset_param(content_type).and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }

    let lower = content_type.to_ascii_lowercase();
    if content_type.is_empty() || lower.contains("html") {
        if let Some(encoding) =
            meta_charset(body).and_then(|label| Encoding::for_label(label.as_bytes()))
        {
            return encoding;
        }
    }

    UTF_8
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|part| {
        let (name, value) = part.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches('"').trim_matches('\'');
        (!label.is_empty()).then_some(label)
    })
}

fn meta_charset(body: &[u8]) -> Option<String> {
    let prefix = &body[..body.len().min(META_SNIFF_LIMIT)];
    let lower = String::from_utf8_lossy(prefix).to_ascii_lowercase();
    let mut search_start = 0;

    while let Some(relative) = lower[search_start..].find("charset=") {
        let label_start = search_start + relative + "charset=".len();
        let label: String = lower[label_start..]
            .trim_start_matches(|c: char| matches!(c, '"' | '\'' | ' '))
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .collect();
        if !label.is_empty() {
            return Some(label);
        }
        search_start = label_start;
    }

    None
}

fn mark_utf8(headers: &mut HeaderMap, source: &'static Encoding) -> Result<()> {
    let current = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let rewritten = match current {
        Some(content_type) => {
            if source == UTF_8 && charset_param(&content_type).is_none() {
                return Ok(());
            }
            let mut parts: Vec<&str> = content_type
                .split(';')
                .map(str::trim)
                .filter(|part| {
                    !part
                        .split_once('=')
                        .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
                })
                .collect();
            parts.push("charset=utf-8");
            parts.join("; ")
        }
        None if source == UTF_8 => return Ok(()),
        None => "text/html; charset=utf-8".to_string(),
    };

    let value = HeaderValue::from_str(&rewritten)
        .context("invalid content-type after charset rewrite")?;
    headers.insert(CONTENT_TYPE, value);
    Ok(())
}

fn content_encodings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty() && token != "identity")
        .collect()
}

fn decode_gzip(data: &[u8]) -> InjectResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| InjectError::Decode(format!("gzip: {err}")))?;
    Ok(out)
}

fn decode_deflate(data: &[u8]) -> InjectResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| InjectError::Decode(format!("deflate: {err}")))?;
    Ok(out)
}

fn decode_brotli(data: &[u8]) -> InjectResult<Vec<u8>> {
    let mut decoder = Decompressor::new(Cursor::new(data), 4096);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| InjectError::Decode(format!("br: {err}")))?;
    Ok(out)
}
