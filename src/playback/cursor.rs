use crate::marks::SpeechMark;
use std::time::Duration;
use tracing::debug;

/// A forward-moving index into a speech-mark sequence.
///
/// Every mark before `index` has a time at or before the last position the
/// cursor was advanced to. Periodic re-sync re-derives the index from the
/// playback position so the counter cannot drift from the audio.
#[derive(Debug, Clone, Default)]
pub struct WordCursor {
    marks: Vec<SpeechMark>,
    index: usize,
    last_sync: Duration,
}

impl WordCursor {
    pub fn new(marks: Vec<SpeechMark>) -> Self {
        Self {
            marks,
            index: 0,
            last_sync: Duration::ZERO,
        }
    }

    /// Swap in a new sequence and rewind.
    pub fn replace(&mut self, marks: Vec<SpeechMark>) {
        self.marks = marks;
        self.reset();
    }

    pub fn marks(&self) -> &[SpeechMark] {
        &self.marks
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn last_sync(&self) -> Duration {
        self.last_sync
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.marks.len()
    }

    /// Step past every mark whose time has been reached and return them.
    pub fn advance(&mut self, position: Duration) -> &[SpeechMark] {
        let start = self.index;
        while self.index < self.marks.len() && self.marks[self.index].time() <= position {
            self.index += 1;
        }
        &self.marks[start..self.index]
    }

    /// Re-derive the index from `position` once `interval` has passed since
    /// the last sync. Returns true when a re-sync happened.
    pub fn periodic_resync(&mut self, position: Duration, interval: Duration) -> bool {
        if position.saturating_sub(self.last_sync) <= interval {
            return false;
        }

        let index = self.first_after(position);
        debug!(
            "Re-syncing at {}ms: index {} -> {}",
            position.as_millis(),
            self.index,
            index
        );
        self.index = index;
        self.last_sync = position;
        true
    }

    /// Jump to `target` and return the marks that must be replayed so the
    /// display shows the word active at `target`.
    ///
    /// That is the last complete word started before `target`, preceded by
    /// the fragments it completes and followed by any unfinished fragments,
    /// which is exactly what continuous playback would have fed the joiner.
    pub fn seek(&mut self, target: Duration) -> &[SpeechMark] {
        self.index = self.first_after(target);
        self.last_sync = target;

        if self.index == 0 {
            return &[];
        }

        let mut start = self.index - 1;
        while start > 0 && self.marks[start].is_fragment() {
            start -= 1;
        }
        while start > 0 && self.marks[start - 1].is_fragment() {
            start -= 1;
        }
        &self.marks[start..self.index]
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.last_sync = Duration::ZERO;
    }

    /// First index whose time is strictly after `position`, or the length.
    fn first_after(&self, position: Duration) -> usize {
        self.marks
            .iter()
            .position(|m| m.time() > position)
            .unwrap_or(self.marks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(times: &[u64]) -> WordCursor {
        WordCursor::new(
            times
                .iter()
                .enumerate()
                .map(|(i, &t)| SpeechMark::new(t, format!("w{}", i)))
                .collect(),
        )
    }

    fn values(marks: &[SpeechMark]) -> Vec<&str> {
        marks.iter().map(|m| m.value.as_str()).collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_advance_emits_each_word_once() {
        let mut c = cursor(&[0, 100, 200, 300]);
        assert_eq!(values(c.advance(ms(0))), vec!["w0"]);
        assert!(c.advance(ms(50)).is_empty());
        assert_eq!(values(c.advance(ms(250))), vec!["w1", "w2"]);
        assert_eq!(values(c.advance(ms(10_000))), vec!["w3"]);
        assert!(c.advance(ms(20_000)).is_empty());
        assert!(c.is_finished());
    }

    #[test]
    fn test_advance_emits_equal_times_together() {
        let mut c = cursor(&[100, 100, 100]);
        assert_eq!(c.advance(ms(100)).len(), 3);
    }

    #[test]
    fn test_advance_matches_passed_marks_for_any_polling() {
        let times = [0, 16, 16, 40, 95, 96, 250, 251, 600, 1200];
        let polls = [0, 5, 16, 17, 60, 96, 96, 400, 1199];
        let mut c = cursor(&times);
        let mut emitted = Vec::new();
        for p in polls {
            emitted.extend(c.advance(ms(p)).iter().map(|m| m.value.clone()));
        }
        let expected: Vec<String> = times
            .iter()
            .enumerate()
            .filter(|(_, &t)| t <= 1199)
            .map(|(i, _)| format!("w{}", i))
            .collect();
        assert_eq!(emitted, expected);
    }

    #[test]
    fn test_resync_waits_for_interval() {
        let mut c = cursor(&[0, 1000, 400_000, 500_000]);
        let interval = ms(300_000);
        assert!(!c.periodic_resync(ms(300_000), interval));
        assert_eq!(c.index(), 0);

        assert!(c.periodic_resync(ms(450_000), interval));
        assert_eq!(c.index(), 3);
        assert_eq!(c.last_sync(), ms(450_000));
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut c = cursor(&[0, 1000, 400_000, 500_000]);
        let interval = ms(300_000);
        c.periodic_resync(ms(420_000), interval);
        let first = c.index();
        c.periodic_resync(ms(420_000), interval);
        assert_eq!(c.index(), first);
    }

    #[test]
    fn test_resync_past_last_mark_finishes() {
        let mut c = cursor(&[0, 1000]);
        assert!(c.periodic_resync(ms(400_000), ms(300_000)));
        assert!(c.is_finished());
    }

    #[test]
    fn test_seek_replays_active_word() {
        let mut c = cursor(&[0, 100, 200, 300]);
        assert_eq!(values(c.seek(ms(150))), vec!["w1"]);
        assert_eq!(c.index(), 2);
        assert_eq!(c.last_sync(), ms(150));
        assert!(c.advance(ms(150)).is_empty());
        assert_eq!(values(c.advance(ms(200))), vec!["w2"]);
    }

    #[test]
    fn test_seek_before_first_word() {
        let mut c = cursor(&[100, 200]);
        assert!(c.seek(ms(50)).is_empty());
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn test_seek_past_end() {
        let mut c = cursor(&[100, 200]);
        assert_eq!(values(c.seek(ms(5000))), vec!["w1"]);
        assert!(c.is_finished());
    }

    #[test]
    fn test_seek_backwards() {
        let mut c = cursor(&[0, 100, 200, 300]);
        c.advance(ms(300));
        assert_eq!(values(c.seek(ms(100))), vec!["w1"]);
        assert_eq!(values(c.advance(ms(300))), vec!["w2", "w3"]);
    }

    #[test]
    fn test_seek_replays_leading_fragments() {
        let mut c = WordCursor::new(vec![
            SpeechMark::new(0, "the"),
            SpeechMark::new(100, "co-"),
            SpeechMark::new(200, "op-"),
            SpeechMark::new(300, "eration"),
            SpeechMark::new(400, "ends"),
        ]);
        assert_eq!(values(c.seek(ms(350))), vec!["co-", "op-", "eration"]);
        assert_eq!(values(c.seek(ms(250))), vec!["the", "co-", "op-"]);
    }

    #[test]
    fn test_reset_rewinds() {
        let mut c = cursor(&[0, 100]);
        c.advance(ms(100));
        c.periodic_resync(ms(400_000), ms(1));
        c.reset();
        assert_eq!(c.index(), 0);
        assert_eq!(c.last_sync(), Duration::ZERO);
    }
}
