pub mod repair;
pub mod source;

pub use repair::{rebase_segments, split_segments, MarkSegment};
pub use source::{chunk_audio_name, chunk_marks_name, AssetSource, DirSource, HttpSource, MemorySource};

use crate::config::LinePolicy;
use crate::error::{Result, WordcastError};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A timestamped token that becomes active at `time_ms` into its audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechMark {
    #[serde(rename = "time", alias = "time_ms", deserialize_with = "deserialize_time_ms")]
    pub time_ms: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    pub value: String,
}

impl SpeechMark {
    pub fn new(time_ms: u64, value: impl Into<String>) -> Self {
        Self {
            time_ms,
            kind: Some("word".to_string()),
            start: None,
            end: None,
            value: value.into(),
        }
    }

    pub fn time(&self) -> Duration {
        Duration::from_millis(self.time_ms)
    }

    /// True when the token is the first half of a word split across a line.
    pub fn is_fragment(&self) -> bool {
        self.value.ends_with('-')
    }
}

/// Accept any non-negative JSON number. Fractions round up to the next
/// millisecond so a word never shows before its mark.
fn deserialize_time_ms<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let time = f64::deserialize(deserializer)?;
    if !time.is_finite() || time < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "time must be a non-negative number, got {}",
            time
        )));
    }
    Ok(time.ceil() as u64)
}

/// Parse a newline-delimited speech-mark stream.
///
/// Blank lines are ignored. Order is preserved as given; nothing is sorted.
pub fn parse_marks(resource: &str, text: &str, policy: LinePolicy) -> Result<Vec<SpeechMark>> {
    let mut marks = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<SpeechMark>(line) {
            Ok(mark) => marks.push(mark),
            Err(e) => match policy {
                LinePolicy::Strict => {
                    return Err(WordcastError::Parse {
                        resource: resource.to_string(),
                        line: number + 1,
                        reason: e.to_string(),
                    });
                }
                LinePolicy::Skip => {
                    warn!("Skipping line {} of {}: {}", number + 1, resource, e);
                }
            },
        }
    }

    Ok(marks)
}

/// Serialize marks back to the newline-delimited form.
pub fn format_marks(marks: &[SpeechMark]) -> Result<String> {
    let mut out = String::new();
    for mark in marks {
        out.push_str(&serde_json::to_string(mark)?);
        out.push('\n');
    }
    Ok(out)
}

/// Fetch and parse one speech-mark resource.
pub async fn load_marks(
    source: &dyn AssetSource,
    resource: &str,
    policy: LinePolicy,
) -> Result<Vec<SpeechMark>> {
    let text = source.fetch_text(resource).await?;
    let marks = parse_marks(resource, &text, policy)?;
    debug!("Loaded {} words from {}", marks.len(), resource);
    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"time":6,"type":"word","start":0,"end":4,"value":"Mandate"}
{"time":373,"type":"word","start":5,"end":8,"value":"for"}
{"time":540,"type":"word","start":9,"end":19,"value":"Leader-"}
{"time":1102,"type":"word","start":20,"end":24,"value":"ship"}

"#;

    #[test]
    fn test_parse_polly_lines() {
        let marks = parse_marks("sample", SAMPLE, LinePolicy::Strict).unwrap();
        assert_eq!(marks.len(), 4);
        assert_eq!(marks[0].time_ms, 6);
        assert_eq!(marks[0].value, "Mandate");
        assert_eq!(marks[0].kind.as_deref(), Some("word"));
        assert_eq!(marks[2].start, Some(9));
        assert!(marks[2].is_fragment());
        assert!(!marks[3].is_fragment());
    }

    #[test]
    fn test_parse_minimal_record() {
        let marks = parse_marks("min", "{\"time\": 10, \"value\": \"a\"}", LinePolicy::Strict).unwrap();
        assert_eq!(marks, vec![SpeechMark { kind: None, ..SpeechMark::new(10, "a") }]);
    }

    #[test]
    fn test_parse_fractional_times() {
        let text = "{\"time\":1500.0,\"value\":\"a\"}\n{\"time\":1500.5,\"value\":\"b\"}\n{\"time\":0.2,\"value\":\"c\"}\n";
        let marks = parse_marks("fractional", text, LinePolicy::Strict).unwrap();
        let times: Vec<u64> = marks.iter().map(|m| m.time_ms).collect();
        assert_eq!(times, vec![1500, 1501, 1]);
    }

    #[test]
    fn test_parse_time_ms_key() {
        let marks = parse_marks("keyed", "{\"time_ms\": 250, \"value\": \"x\"}", LinePolicy::Strict).unwrap();
        assert_eq!(marks[0].time_ms, 250);
        assert_eq!(marks[0].value, "x");

        // Written back under the canonical key.
        assert!(format_marks(&marks).unwrap().starts_with("{\"time\":250,"));
    }

    #[test]
    fn test_parse_keeps_given_order() {
        let text = "{\"time\":50,\"value\":\"b\"}\n{\"time\":10,\"value\":\"a\"}\n";
        let marks = parse_marks("unordered", text, LinePolicy::Strict).unwrap();
        assert_eq!(marks[0].value, "b");
        assert_eq!(marks[1].value, "a");
    }

    #[test]
    fn test_strict_rejects_malformed_lines() {
        let cases = [
            "{\"value\":\"no time\"}",
            "{\"time\":5}",
            "{\"time\":\"soon\",\"value\":\"x\"}",
            "{\"time\":-5,\"value\":\"x\"}",
            "{\"time\":-0.5,\"value\":\"x\"}",
            "{\"time\":null,\"value\":\"x\"}",
            "not json",
        ];
        for case in cases {
            let text = format!("{{\"time\":1,\"value\":\"ok\"}}\n{}\n", case);
            match parse_marks("bad", &text, LinePolicy::Strict) {
                Err(WordcastError::Parse { line, .. }) => assert_eq!(line, 2, "case {}", case),
                other => panic!("expected parse error for {}, got {:?}", case, other),
            }
        }
    }

    #[test]
    fn test_skip_policy_drops_bad_lines() {
        let text = "{\"time\":1,\"value\":\"ok\"}\ngarbage\n{\"time\":2,\"value\":\"fine\"}\n";
        let marks = parse_marks("mixed", text, LinePolicy::Skip).unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[1].value, "fine");
    }

    #[test]
    fn test_format_round_trips_fields() {
        let marks = parse_marks("sample", SAMPLE, LinePolicy::Strict).unwrap();
        let text = format_marks(&marks).unwrap();
        assert!(text.starts_with("{\"time\":6,\"type\":\"word\",\"start\":0,\"end\":4,\"value\":\"Mandate\"}\n"));
        assert_eq!(parse_marks("again", &text, LinePolicy::Strict).unwrap(), marks);
    }

    #[tokio::test]
    async fn test_load_marks_from_memory() {
        let source = MemorySource::new().with("chunk_0000_marks.json", SAMPLE);
        let marks = load_marks(&source, "chunk_0000_marks.json", LinePolicy::Strict)
            .await
            .unwrap();
        assert_eq!(marks.len(), 4);

        let missing = load_marks(&source, "chunk_0001_marks.json", LinePolicy::Strict).await;
        assert!(matches!(missing, Err(WordcastError::Load { .. })));
    }
}
