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

/// Markers that must all appear somewhere in a body before it is treated as a full document.
const DOCUMENT_MARKERS: [&str; 3] = ["<html", "<body", "<head"];

/// Insertion anchor: the payload always lands directly in front of the first occurrence.
pub const CLOSING_BODY: &str = "</body>";

/// Result of sniffing a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not an HTML document (or not text at all); forward untouched.
    Passthrough,
    /// Looks like a full document but has no `</body>` to anchor the payload on.
    HtmlWithoutClosingBody,
    /// Full document with a closing body tag; eligible for injection.
    Rewritable,
}

/// Substring sniffer deciding whether a decoded body is an HTML document we can rewrite.
///
/// Matching is plain, case-sensitive substring search over the whole body. Pages on the
/// live web are routinely malformed, and a structural parse would drop exactly the
/// broken-but-renderable documents this proxy needs to reach, so the cheap markers are the
/// policy and must not be swapped for an HTML parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDetector;

impl HtmlDetector {
    pub fn classify(&self, body: &str) -> Verdict {
        if !DOCUMENT_MARKERS.iter().all(|marker| body.contains(marker)) {
            return Verdict::Passthrough;
        }
        if body.contains(CLOSING_BODY) {
            Verdict::Rewritable
        } else {
            Verdict::HtmlWithoutClosingBody
        }
    }
}
