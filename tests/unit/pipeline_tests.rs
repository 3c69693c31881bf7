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

use std::fs;
use std::io::Write;
use std::sync::Arc;

use flate2::{write::GzEncoder, Compression};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Uri};
use static_inject::app::{InjectApp, ReplayJob, ReplaySummary};
use static_inject::assets::InjectionPayload;
use static_inject::config::InjectConfig;
use static_inject::inject::{ArtifactStore, InterceptOutcome, Interceptor, SequenceCounter};
use static_inject::proxy::flow::{Flow, RequestParts, ResponseParts};
use static_inject::proxy::stages::StagePipeline;
use static_inject::telemetry::TelemetrySink;
use tempfile::tempdir;

const DOCUMENT: &str = "<!doctype html><html><head><title>t</title></head><body><p>x</p></body></html>";

fn pipeline(dir: &std::path::Path, start: u64) -> (StagePipeline, Arc<Interceptor>) {
    let interceptor = Arc::new(Interceptor::new(
        InjectionPayload::from_static("<script>/*static*/</script>"),
        Arc::new(SequenceCounter::new(start)),
        ArtifactStore::new(dir),
    ));
    let pipeline = StagePipeline::build(interceptor.clone(), TelemetrySink::default(), true);
    (pipeline, interceptor)
}

fn build_flow(headers: HeaderMap, body: &[u8]) -> Flow {
    let mut flow = Flow::new(RequestParts::get(Uri::from_static("https://example.com/quiz")));
    flow.response = Some(ResponseParts::ok(headers, body));
    flow
}

fn html_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers
}

#[tokio::test]
async fn html_stage_rewrites_body_and_fixes_length() {
    let dir = tempdir().expect("tempdir");
    let (pipeline, interceptor) = pipeline(dir.path(), 0);
    let mut flow = build_flow(html_headers(), DOCUMENT.as_bytes());

    pipeline
        .process_response_body(&mut flow)
        .await
        .expect("stage never fails the flow");

    let response = flow.response.as_ref().expect("response");
    let body = std::str::from_utf8(response.body.as_bytes()).expect("utf8");
    assert!(body.ends_with("<p>x</p><script>/*static*/</script></body></html>"));
    assert_eq!(
        response
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok()),
        Some(body.len().to_string().as_str())
    );
    assert_eq!(flow.metadata.injection.as_ref().and_then(|o| o.sequence()), Some(0));
    assert_eq!(interceptor.counter().peek(), 1);
}

#[tokio::test]
async fn gzip_document_is_decoded_before_injection() {
    let dir = tempdir().expect("tempdir");
    let (pipeline, _) = pipeline(dir.path(), 10);

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(DOCUMENT.as_bytes()).expect("compress");
    let compressed = encoder.finish().expect("finish gzip");

    let mut headers = html_headers();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    let mut flow = build_flow(headers, &compressed);

    pipeline.process_response_body(&mut flow).await.expect("pipeline");

    let response = flow.response.as_ref().expect("response");
    assert!(response.headers.get(CONTENT_ENCODING).is_none());
    let body = std::str::from_utf8(response.body.as_bytes()).expect("plain text body");
    assert!(body.contains("<script>/*static*/</script></body>"));

    let original = fs::read_to_string(dir.path().join("original_10.html")).expect("artifact");
    assert_eq!(original, DOCUMENT);
}

#[tokio::test]
async fn latin1_document_is_injected_and_served_as_utf8() {
    let dir = tempdir().expect("tempdir");
    let (pipeline, _) = pipeline(dir.path(), 0);

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=iso-8859-1"),
    );
    let latin1 = b"<html><head></head><body>caf\xe9</body></html>";
    let mut flow = build_flow(headers, latin1);

    pipeline.process_response_body(&mut flow).await.expect("pipeline");

    assert_eq!(flow.metadata.injection.as_ref().and_then(|o| o.sequence()), Some(0));
    let response = flow.response.as_ref().expect("response");
    let body = std::str::from_utf8(response.body.as_bytes()).expect("utf8 body");
    assert_eq!(
        body,
        "<html><head></head><body>caf\u{e9}<script>/*static*/</script></body></html>"
    );
    assert_eq!(
        response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/html; charset=utf-8")
    );
    let original = fs::read_to_string(dir.path().join("original_0.html")).expect("artifact");
    assert_eq!(original, "<html><head></head><body>caf\u{e9}</body></html>");
}

#[tokio::test]
async fn binary_and_unsupported_bodies_are_left_alone() {
    let dir = tempdir().expect("tempdir");
    let (pipeline, interceptor) = pipeline(dir.path(), 0);

    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff];
    let mut flow = build_flow(HeaderMap::new(), &png);
    pipeline.process_response_body(&mut flow).await.expect("pipeline");
    assert_eq!(flow.response.as_ref().expect("response").body.as_bytes(), &png);
    assert!(flow.metadata.injection.is_none());
    assert!(flow.metadata.body_skip_reason.is_some());

    let mut headers = html_headers();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("zstd"));
    let mut flow = build_flow(headers, DOCUMENT.as_bytes());
    pipeline.process_response_body(&mut flow).await.expect("pipeline");
    let response = flow.response.as_ref().expect("response");
    assert_eq!(response.body.as_bytes(), DOCUMENT.as_bytes());
    assert!(response.headers.get(CONTENT_ENCODING).is_some());

    assert_eq!(interceptor.counter().peek(), 0);
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[tokio::test]
async fn passthrough_outcome_is_recorded_on_the_flow() {
    let dir = tempdir().expect("tempdir");
    let (pipeline, _) = pipeline(dir.path(), 0);
    let mut flow = build_flow(HeaderMap::new(), b"{\"ok\":true}");

    pipeline.process_response_body(&mut flow).await.expect("pipeline");

    assert_eq!(flow.metadata.injection, Some(InterceptOutcome::Passthrough));
    assert!(flow.response.as_ref().expect("response").headers.get(CONTENT_LENGTH).is_none());
}

#[tokio::test]
async fn flow_without_response_is_ignored() {
    let dir = tempdir().expect("tempdir");
    let (pipeline, _) = pipeline(dir.path(), 0);
    let mut flow = Flow::new(RequestParts::default());

    pipeline.process_response_body(&mut flow).await.expect("pipeline");
    assert!(flow.metadata.injection.is_none());
}

#[tokio::test]
async fn replay_resumes_numbering_and_writes_delivered_bodies() {
    let root = tempdir().expect("tempdir");
    let pages = root.path().join("pages");
    let inputs = root.path().join("inputs");
    let delivered = root.path().join("delivered");
    for dir in [&pages, &inputs, &delivered] {
        fs::create_dir(dir).expect("mkdir");
    }
    fs::write(pages.join("original_6.html"), "old").expect("seed artifact");
    fs::write(pages.join("modified_6.html"), "old").expect("seed artifact");

    fs::write(inputs.join("a.html"), DOCUMENT).expect("input");
    fs::write(inputs.join("b.json"), "{}").expect("input");

    let cfg_path = root.path().join("inject.toml");
    fs::write(
        &cfg_path,
        "[storage]\ndir = \"pages\"\nresume = true\n\n[telemetry]\nmode = \"stdout\"\n",
    )
    .expect("config");

    let config = InjectConfig::load(&cfg_path).expect("config loads");
    let app = InjectApp::new(config).await.expect("app");
    assert_eq!(app.interceptor().counter().peek(), 7);

    let summary = app
        .replay(ReplayJob {
            target: Uri::from_static("https://example.com/"),
            inputs: vec![
                inputs.join("a.html"),
                inputs.join("b.json"),
                inputs.join("missing.html"),
            ],
            output_dir: Some(delivered.clone()),
        })
        .await
        .expect("replay");

    assert_eq!(
        summary,
        ReplaySummary {
            injected: 1,
            passthrough: 1,
            failed: 1,
        }
    );
    assert_eq!(fs::read_to_string(pages.join("original_7.html")).expect("artifact"), DOCUMENT);
    let delivered_doc = fs::read_to_string(delivered.join("a.html")).expect("delivered");
    assert_eq!(
        fs::read_to_string(pages.join("modified_7.html")).expect("artifact"),
        delivered_doc
    );
    assert_eq!(fs::read_to_string(delivered.join("b.json")).expect("delivered"), "{}");
}
