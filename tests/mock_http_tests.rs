//! Mock HTTP tests for remote asset loading
//!
//! Chunks are served from a local wiremock server instead of a real host.

use chrono::NaiveDate;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wordcast::config::{Config, LinePolicy};
use wordcast::marks::{chunk_marks_name, load_marks, AssetSource, HttpSource};
use wordcast::playback::{AudioOutput, MemorySink, SimulatedOutput};
use wordcast::schedule::{ChunkSequencer, ManualClock, SequencerState};
use wordcast::WordcastError;

const CHUNK_MARKS: &str = "{\"time\":0,\"type\":\"word\",\"start\":0,\"end\":4,\"value\":\"Call\"}
{\"time\":400,\"type\":\"word\",\"start\":5,\"end\":7,\"value\":\"me\"}
{\"time\":800,\"type\":\"word\",\"start\":8,\"end\":15,\"value\":\"Ishmael\"}

";

async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

// ============================================================================
// HttpSource Tests
// ============================================================================

mod http_source_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetches_marks_over_http() {
        let server = MockServer::start().await;
        serve(&server, "/chunks/chunk_0000_marks.json", 200, CHUNK_MARKS).await;

        let source = HttpSource::new(format!("{}/chunks/", server.uri()));
        let marks = assert_ok!(load_marks(&source, &chunk_marks_name(0), LinePolicy::Strict).await);

        let words: Vec<&str> = marks.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(words, vec!["Call", "me", "Ishmael"]);
        assert_eq!(marks[2].time_ms, 800);
        assert_eq!(marks[2].start, Some(8));
    }

    #[tokio::test]
    async fn test_missing_resource_is_a_load_error() {
        let server = MockServer::start().await;
        serve(&server, "/chunks/chunk_0000_marks.json", 404, "not found").await;

        let source = HttpSource::new(format!("{}/chunks", server.uri()));
        let err = assert_err!(source.fetch_text(&chunk_marks_name(0)).await);

        assert!(matches!(err, WordcastError::Load { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        serve(&server, "/marks.json", 200, "{\"time\":0,\"value\":\"ok\"}\n<html>\n").await;

        let source = HttpSource::new(server.uri());
        let err = load_marks(&source, "marks.json", LinePolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, WordcastError::Parse { line: 2, .. }));

        let marks = load_marks(&source, "marks.json", LinePolicy::Skip).await.unwrap();
        assert_eq!(marks.len(), 1);
    }
}

// ============================================================================
// Remote Broadcast Tests
// ============================================================================

mod remote_broadcast_tests {
    use super::*;

    fn config(base: &str) -> Config {
        Config {
            asset_root: base.to_string(),
            total_chunks: 2,
            total_content_secs: 200.0,
            sync_secs: 100.0,
            chunk_retries: 2,
            retry_base_delay_ms: 1,
            ..Config::default()
        }
    }

    fn midnight() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_sequencer_streams_chunk_from_server() {
        let server = MockServer::start().await;
        serve(&server, "/chunks/chunk_0000_marks.json", 200, CHUNK_MARKS).await;

        let base = format!("{}/chunks", server.uri());
        let mut seq = ChunkSequencer::new(
            &config(&base),
            Box::new(HttpSource::new(base.clone())),
            SimulatedOutput::new(),
            MemorySink::new(),
            ManualClock::new(midnight()),
        );
        seq.initialize().await.unwrap();

        assert_eq!(seq.state(), &SequencerState::Playing { chunk: 0 });
        assert_eq!(
            seq.output().source().unwrap().uri,
            format!("{}/chunk_0000.mp3", base)
        );
        assert_eq!(seq.output().duration(), Some(Duration::from_millis(800)));
    }

    #[tokio::test]
    async fn test_unreachable_chunk_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chunks/chunk_0000_marks.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let base = format!("{}/chunks", server.uri());
        let mut seq = ChunkSequencer::new(
            &config(&base),
            Box::new(HttpSource::new(base)),
            SimulatedOutput::new(),
            MemorySink::new(),
            ManualClock::new(midnight()),
        );

        let err = seq.initialize().await.unwrap_err();
        assert!(matches!(err, WordcastError::ChunkLoad { index: 0, attempts: 3, .. }));
        assert!(matches!(seq.state(), SequencerState::Failed { chunk: 0, .. }));
        assert_eq!(seq.sink().errors().len(), 1);

        server.verify().await;
    }
}
