//! Rebasing of concatenated speech-mark streams.
//!
//! Synthesizing a long text in pieces and concatenating the mark files yields
//! a stream whose times restart near zero at every piece. These helpers find
//! the restarts and rewrite the times onto one continuous timeline.

use super::SpeechMark;
use tracing::{debug, info};

/// A run of marks whose times never decrease.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkSegment {
    pub marks: Vec<SpeechMark>,
    /// Time of the segment's last mark, used as its length.
    pub duration_ms: u64,
}

/// Split wherever a mark's time is lower than its predecessor's.
pub fn split_segments(marks: Vec<SpeechMark>) -> Vec<MarkSegment> {
    let mut segments = Vec::new();
    let mut current: Vec<SpeechMark> = Vec::new();
    let mut last_time = 0;

    for mark in marks {
        if mark.time_ms < last_time && !current.is_empty() {
            segments.push(close_segment(std::mem::take(&mut current)));
        }
        last_time = mark.time_ms;
        current.push(mark);
    }

    if !current.is_empty() {
        segments.push(close_segment(current));
    }

    segments
}

fn close_segment(marks: Vec<SpeechMark>) -> MarkSegment {
    let duration_ms = marks.last().map(|m| m.time_ms).unwrap_or(0);
    MarkSegment { marks, duration_ms }
}

/// Shift every segment by the summed durations of the segments before it.
pub fn rebase_segments(marks: Vec<SpeechMark>) -> Vec<SpeechMark> {
    let segments = split_segments(marks);
    info!("Found {} segments", segments.len());

    let mut rebased = Vec::new();
    let mut offset = 0u64;

    for (i, segment) in segments.into_iter().enumerate() {
        let count = segment.marks.len();
        rebased.extend(segment.marks.into_iter().map(|mut mark| {
            mark.time_ms += offset;
            mark
        }));
        offset += segment.duration_ms;
        debug!(
            "Segment {}: {} words, duration {}ms, cumulative {}ms",
            i, count, segment.duration_ms, offset
        );
    }

    rebased
}
