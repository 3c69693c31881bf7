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

use bytes::BytesMut;
use http::{HeaderMap, Method, Uri, Version};

use crate::inject::InterceptOutcome;

/// Flow tracks a single HTTP request/response pair handed over by the host proxy engine.
///
/// The engine owns the connection, TLS, and framing; it fills in the parsed request, adds
/// the buffered response once upstream answers, runs the stage pipeline, and delivers
/// whatever body the pipeline leaves behind. Stages only ever see the Flow for the duration
/// of one pipeline call.
#[derive(Debug)]
pub struct Flow {
    /// Unique identifier for this request/response pair (UUID v7 = timestamp-sortable).
    pub id: uuid::Uuid,

    /// Parsed HTTP request from the client (method, URI, headers, body).
    pub request: RequestParts,

    /// Parsed HTTP response from upstream. None until the upstream response arrives.
    pub response: Option<ResponseParts>,

    /// What the stages decided about this flow, for telemetry and the host engine.
    pub metadata: FlowMetadata,
}

impl Flow {
    pub fn new(request: RequestParts) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            request,
            response: None,
            metadata: FlowMetadata::default(),
        }
    }

    /// Request address used in diagnostics.
    pub fn target(&self) -> String {
        self.request.uri.to_string()
    }
}

/// Parsed HTTP request components (method, URI, version, headers, body).
#[derive(Debug)]
pub struct RequestParts {
    pub method: Method,

    pub uri: Uri,

    pub version: Version,

    pub headers: HeaderMap,

    pub body: BodyBuffer,
}

impl RequestParts {
    /// Bodyless GET for the given URI, the common shape for document navigations.
    pub fn get(uri: Uri) -> Self {
        Self {
            method: Method::GET,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: BodyBuffer::default(),
        }
    }
}

impl Default for RequestParts {
    fn default() -> Self {
        Self::get(Uri::from_static("http://localhost/"))
    }
}

/// Parsed HTTP response components (status, version, headers, body).
#[derive(Debug, Default)]
pub struct ResponseParts {
    pub status: http::StatusCode,

    pub version: Version,

    pub headers: HeaderMap,

    pub body: BodyBuffer,
}

impl ResponseParts {
    pub fn ok(headers: HeaderMap, body: &[u8]) -> Self {
        let mut buffer = BodyBuffer::default();
        buffer.push_bytes(body);
        Self {
            status: http::StatusCode::OK,
            version: Version::HTTP_11,
            headers,
            body: buffer,
        }
    }
}

/// Growable byte buffer for HTTP request/response bodies.
///
/// Bodies are fully buffered; the injector needs the complete document before it can find
/// the closing body tag.
#[derive(Debug, Default)]
pub struct BodyBuffer {
    data: BytesMut,
}

impl BodyBuffer {
    pub fn push_bytes(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Replaces the buffer with new contents.
    pub fn replace(&mut self, chunk: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Stage results the host engine and telemetry can read back after the pipeline ran.
#[derive(Debug, Default)]
pub struct FlowMetadata {
    /// Outcome of the HTML injector; None when the stage never saw a text body.
    pub injection: Option<InterceptOutcome>,

    /// Why the body could not be turned into text (unsupported encoding, invalid charset bytes).
    pub body_skip_reason: Option<String>,
}
