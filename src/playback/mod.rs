pub mod cursor;
pub mod display;
pub mod format;
pub mod hyphen;
pub mod output;

pub use cursor::WordCursor;
pub use display::{DisplayEvent, DisplaySink, MemorySink, TerminalSink};
pub use format::{format_clock, format_elapsed};
pub use hyphen::HyphenJoiner;
pub use output::{probe_wav_duration, AudioOutput, AudioSource, SimulatedOutput};

use crate::config::HyphenPolicy;
use crate::marks::SpeechMark;
use std::time::Duration;

/// The word path shared by both players: cursor, then joiner, then sink.
#[derive(Debug, Clone, Default)]
pub struct WordTrack {
    cursor: WordCursor,
    joiner: HyphenJoiner,
}

impl WordTrack {
    pub fn new(marks: Vec<SpeechMark>) -> Self {
        Self {
            cursor: WordCursor::new(marks),
            joiner: HyphenJoiner::new(),
        }
    }

    pub fn cursor(&self) -> &WordCursor {
        &self.cursor
    }

    pub fn joiner(&self) -> &HyphenJoiner {
        &self.joiner
    }

    /// Replace the marks for a new chunk. The pending fragment is kept or
    /// dropped according to `policy`.
    pub fn load(&mut self, marks: Vec<SpeechMark>, policy: HyphenPolicy) {
        self.cursor.replace(marks);
        if policy == HyphenPolicy::Drop {
            self.joiner.clear();
        }
    }

    /// Show every word reached by `position`. Returns how many marks passed.
    pub fn advance(&mut self, position: Duration, sink: &mut dyn DisplaySink) -> usize {
        let passed = self.cursor.advance(position);
        for mark in passed {
            if let Some(word) = self.joiner.push(&mark.value) {
                sink.show_word(&word);
            }
        }
        passed.len()
    }

    pub fn resync(&mut self, position: Duration, interval: Duration) -> bool {
        self.cursor.periodic_resync(position, interval)
    }

    /// Jump to `target` and show the word active there.
    pub fn seek(&mut self, target: Duration, sink: &mut dyn DisplaySink) {
        self.joiner.clear();
        sink.clear();
        for mark in self.cursor.seek(target) {
            if let Some(word) = self.joiner.push(&mark.value) {
                sink.show_word(&word);
            }
        }
    }

    /// Rewind to the first mark and forget any fragment.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.joiner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> WordTrack {
        WordTrack::new(vec![
            SpeechMark::new(0, "A"),
            SpeechMark::new(100, "sys-"),
            SpeechMark::new(200, "tem"),
            SpeechMark::new(300, "runs"),
            SpeechMark::new(400, "now"),
        ])
    }

    #[test]
    fn test_advance_joins_and_displays() {
        let mut t = track();
        let mut sink = MemorySink::new();
        assert_eq!(t.advance(Duration::from_millis(150), &mut sink), 2);
        assert_eq!(sink.words(), vec!["A"]);
        assert_eq!(t.joiner().pending(), Some("sys-"));

        t.advance(Duration::from_millis(1000), &mut sink);
        assert_eq!(sink.words(), vec!["A", "system", "runs", "now"]);
        assert_eq!(sink.current.as_deref(), Some("now"));
    }

    #[test]
    fn test_seek_matches_continuous_playback() {
        for target in [0u64, 50, 100, 150, 200, 250, 300, 399, 400, 5000] {
            let target = Duration::from_millis(target);

            let mut continuous = track();
            let mut played = MemorySink::new();
            for step in (0..=target.as_millis() as u64).step_by(16) {
                continuous.advance(Duration::from_millis(step), &mut played);
            }
            continuous.advance(target, &mut played);

            let mut seeking = track();
            let mut scrubbed = MemorySink::new();
            seeking.advance(Duration::from_millis(400), &mut scrubbed);
            seeking.seek(target, &mut scrubbed);
            seeking.advance(target, &mut scrubbed);

            assert_eq!(scrubbed.current, played.current, "target {:?}", target);
        }
    }

    #[test]
    fn test_seek_clears_fragment() {
        let mut t = track();
        let mut sink = MemorySink::new();
        t.advance(Duration::from_millis(150), &mut sink);
        t.seek(Duration::from_millis(350), &mut sink);
        assert_eq!(t.joiner().pending(), None);
        assert_eq!(sink.current.as_deref(), Some("runs"));
    }

    #[test]
    fn test_load_respects_hyphen_policy() {
        let mut t = track();
        let mut sink = MemorySink::new();
        t.advance(Duration::from_millis(150), &mut sink);

        let mut carried = t.clone();
        carried.load(vec![SpeechMark::new(0, "tem")], HyphenPolicy::Carry);
        carried.advance(Duration::ZERO, &mut sink);
        assert_eq!(sink.current.as_deref(), Some("system"));

        t.load(vec![SpeechMark::new(0, "tem")], HyphenPolicy::Drop);
        t.advance(Duration::ZERO, &mut sink);
        assert_eq!(sink.current.as_deref(), Some("tem"));
        assert_eq!(t.cursor().index(), 1);
    }
}
