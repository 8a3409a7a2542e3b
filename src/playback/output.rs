use crate::error::{Result, WordcastError};
use hound::WavReader;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// An audio resource handed to an [`AudioOutput`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub uri: String,
    /// Known or estimated length. Real players learn it from metadata.
    pub duration: Option<Duration>,
}

impl AudioSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// The audio element the controllers drive.
///
/// Implementations report the authoritative playback position; everything
/// else in the crate derives word timing from it.
pub trait AudioOutput {
    fn load(&mut self, source: AudioSource);
    fn source(&self) -> Option<&AudioSource>;
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    fn seek(&mut self, position: Duration);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// Start playback. Fails when the platform refuses unsolicited audio.
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;
    fn is_muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    /// Elapsed playback time in milliseconds.
    fn elapsed_ms(&self) -> u64 {
        self.position().as_millis() as u64
    }
}

/// Read the real length of a local WAV file.
pub fn probe_wav_duration(path: &Path) -> Result<Duration> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(WordcastError::load(
            path.display().to_string(),
            "WAV header reports a zero sample rate",
        ));
    }
    let frames = reader.duration() as f64;
    Ok(Duration::from_secs_f64(frames / spec.sample_rate as f64))
}

/// An output that produces no sound and advances on the tokio clock.
///
/// With a paused tokio runtime it becomes a fully virtual player.
#[derive(Debug)]
pub struct SimulatedOutput {
    source: Option<AudioSource>,
    /// Position at the moment `anchor` was taken.
    base: Duration,
    /// Set while playing.
    anchor: Option<Instant>,
    rate: f64,
    muted: bool,
    autoplay_allowed: bool,
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self {
            source: None,
            base: Duration::ZERO,
            anchor: None,
            rate: 1.0,
            muted: false,
            autoplay_allowed: true,
        }
    }

    /// Refuse `play` until [`SimulatedOutput::user_gesture`] is called.
    pub fn with_autoplay_blocked(mut self) -> Self {
        self.autoplay_allowed = false;
        self
    }

    pub fn user_gesture(&mut self) {
        self.autoplay_allowed = true;
    }

    fn clamp(&self, position: Duration) -> Duration {
        match self.duration() {
            Some(total) => position.min(total),
            None => position,
        }
    }
}

impl AudioOutput for SimulatedOutput {
    fn load(&mut self, source: AudioSource) {
        debug!("Loading audio {}", source.uri);
        self.source = Some(source);
        self.base = Duration::ZERO;
        self.anchor = None;
    }

    fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    fn position(&self) -> Duration {
        let position = match self.anchor {
            Some(anchor) => self.base + anchor.elapsed().mul_f64(self.rate),
            None => self.base,
        };
        self.clamp(position)
    }

    fn duration(&self) -> Option<Duration> {
        self.source.as_ref().and_then(|s| s.duration)
    }

    fn seek(&mut self, position: Duration) {
        self.base = self.clamp(position);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if !rate.is_finite() || rate < 0.0 {
            warn!("Rejecting playback rate {}", rate);
            return;
        }
        if self.anchor.is_some() {
            self.base = self.position();
            self.anchor = Some(Instant::now());
        }
        self.rate = rate;
    }

    fn play(&mut self) -> Result<()> {
        if !self.autoplay_allowed {
            return Err(WordcastError::Autoplay(
                "playback requires a user gesture".to_string(),
            ));
        }
        if self.source.is_none() {
            return Err(WordcastError::Autoplay("no audio source loaded".to_string()));
        }
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.anchor.is_some() {
            self.base = self.position();
            self.anchor = None;
        }
    }

    fn is_paused(&self) -> bool {
        self.anchor.is_none() || self.has_ended()
    }

    fn has_ended(&self) -> bool {
        match self.duration() {
            Some(total) => self.position() >= total,
            None => false,
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_seconds() -> AudioSource {
        AudioSource::new("memory:chunk_0000.mp3").with_duration(Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_follows_rate() {
        let mut output = SimulatedOutput::new();
        output.load(ten_seconds());
        output.set_playback_rate(2.0);
        output.play().unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(output.position(), Duration::from_secs(2));
        assert_eq!(output.elapsed_ms(), 2000);

        output.set_playback_rate(1.0);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(output.position(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_rate_is_rejected() {
        let mut output = SimulatedOutput::new();
        output.load(ten_seconds());
        output.set_playback_rate(f64::NAN);
        output.set_playback_rate(-1.0);
        assert_eq!(output.playback_rate(), 1.0);

        output.play().unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(output.position(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_position() {
        let mut output = SimulatedOutput::new();
        output.load(ten_seconds());
        output.play().unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;
        output.pause();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(output.position(), Duration::from_millis(1500));
        assert!(output.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ends_at_duration() {
        let mut output = SimulatedOutput::new();
        output.load(ten_seconds());
        output.seek(Duration::from_secs(9));
        output.play().unwrap();
        assert!(!output.has_ended());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(output.has_ended());
        assert!(output.is_paused());
        assert_eq!(output.position(), Duration::from_secs(10));
    }

    #[test]
    fn test_blocked_autoplay_needs_gesture() {
        let mut output = SimulatedOutput::new().with_autoplay_blocked();
        output.load(ten_seconds());
        assert!(matches!(output.play(), Err(WordcastError::Autoplay(_))));
        output.user_gesture();
        assert!(output.play().is_ok());
    }

    #[test]
    fn test_probe_wav_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0000.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..12_000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(probe_wav_duration(&path).unwrap(), Duration::from_millis(1500));
    }
}
