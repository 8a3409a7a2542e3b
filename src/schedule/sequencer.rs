use crate::config::{Config, HyphenPolicy, LinePolicy};
use crate::error::{Result, WordcastError};
use crate::marks::{chunk_audio_name, chunk_marks_name, load_marks, AssetSource, SpeechMark};
use crate::playback::{
    format_elapsed, probe_wav_duration, AudioOutput, AudioSource, DisplaySink, WordTrack,
};
use crate::schedule::day_clock::{self, DayClock};
use crate::schedule::locate::{AverageChunkLocator, ChunkLocator, ChunkPosition};
use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Settings the sequencer takes from [`Config`].
#[derive(Debug, Clone)]
pub struct SequencerSettings {
    pub total_chunks: usize,
    pub base_speed: f64,
    pub audio_extension: String,
    pub line_policy: LinePolicy,
    pub hyphen_policy: HyphenPolicy,
    pub retries: u32,
    pub retry_base_delay: Duration,
}

impl From<&Config> for SequencerSettings {
    fn from(config: &Config) -> Self {
        Self {
            total_chunks: config.total_chunks,
            base_speed: config.base_speed(),
            audio_extension: config.audio_extension.clone(),
            line_policy: config.line_policy,
            hyphen_policy: config.hyphen_policy,
            retries: config.chunk_retries,
            retry_base_delay: config.retry_base_delay(),
        }
    }
}

/// Where the sequencer is in its daily cycle.
///
/// ```text
/// Uninitialized ──initialize──▶ Playing(i) ──ended──▶ Playing(i+1) ──…
///     Playing(last) ──ended──▶ Exhausted ──midnight──▶ Playing(0)
///     any load failure ──▶ Failed ──midnight──▶ Playing(0)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerState {
    Uninitialized,
    Playing { chunk: usize },
    Exhausted { restart_at: NaiveDateTime },
    Failed { chunk: usize, restart_at: NaiveDateTime },
}

/// Plays a multi-chunk program aligned to the time of day.
///
/// Anyone starting at the same local time lands on the same word: the
/// content position is `seconds_since_midnight * base_speed`, and the
/// program loops every midnight.
pub struct ChunkSequencer<O, D, C> {
    assets: Box<dyn AssetSource>,
    output: O,
    sink: D,
    clock: C,
    locator: Box<dyn ChunkLocator>,
    settings: SequencerSettings,
    track: WordTrack,
    state: SequencerState,
    chunk_index: usize,
    /// Content time of every fully played chunk before the current one.
    cumulative: Duration,
    playing: bool,
}

impl<O, D, C> ChunkSequencer<O, D, C>
where
    O: AudioOutput,
    D: DisplaySink,
    C: DayClock,
{
    pub fn new(
        config: &Config,
        assets: Box<dyn AssetSource>,
        output: O,
        sink: D,
        clock: C,
    ) -> Self {
        let settings = SequencerSettings::from(config);
        let locator = AverageChunkLocator::new(config.total_chunks, config.average_chunk_secs());
        Self {
            assets,
            output,
            sink,
            clock,
            locator: Box::new(locator),
            settings,
            track: WordTrack::default(),
            state: SequencerState::Uninitialized,
            chunk_index: 0,
            cumulative: Duration::ZERO,
            playing: false,
        }
    }

    /// Replace the average-length locator, e.g. with an exact one.
    pub fn with_locator(mut self, locator: Box<dyn ChunkLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    pub fn cumulative(&self) -> Duration {
        self.cumulative
    }

    /// Cumulative content time including the current chunk's progress.
    pub fn elapsed(&self) -> Duration {
        self.cumulative + self.output.position()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn track(&self) -> &WordTrack {
        &self.track
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn position_from_time_of_day(&self) -> Duration {
        day_clock::position_from_time_of_day(self.clock.now(), self.settings.base_speed)
    }

    pub fn locate(&self, position: Duration) -> ChunkPosition {
        self.locator.locate(position)
    }

    /// Jump to whatever should be playing right now.
    ///
    /// Does not start the audio; call [`ChunkSequencer::play`] afterwards.
    pub async fn initialize(&mut self) -> Result<ChunkPosition> {
        let target = self.position_from_time_of_day();
        let position = self.locator.locate(target);

        self.chunk_index = position.index;
        self.cumulative = self.locator.chunk_start(position.index);
        self.track.reset();

        if let Err(e) = self.load_chunk(position.index).await {
            self.enter_failed(position.index, &e);
            return Err(e);
        }

        self.output.seek(position.offset);
        self.output.set_playback_rate(self.settings.base_speed);

        if position.index + 1 >= self.settings.total_chunks && self.output.has_ended() {
            info!("Time of day is past the end of the program");
            self.enter_exhausted();
            return Ok(position);
        }

        self.state = SequencerState::Playing {
            chunk: position.index,
        };

        info!(
            "Synced to time of day: chunk {}, offset {:.2}s",
            position.index,
            position.offset.as_secs_f64()
        );
        Ok(position)
    }

    /// Start the audio and the word polling.
    ///
    /// A refused start leaves everything paused until the next explicit call.
    pub fn play(&mut self) -> Result<()> {
        if !matches!(self.state, SequencerState::Playing { .. }) {
            return Ok(());
        }
        match self.output.play() {
            Ok(()) => {
                self.playing = true;
                Ok(())
            }
            Err(e) => {
                warn!("Autoplay blocked, user must start playback: {}", e);
                self.playing = false;
                Err(e)
            }
        }
    }

    /// Fetch chunk `index` and swap it in, retrying with backoff.
    ///
    /// The audio source changes only after the marks have arrived, so audio
    /// and words never come from different chunks.
    pub async fn load_chunk(&mut self, index: usize) -> Result<()> {
        info!("Loading chunk {}...", index);
        let marks_name = chunk_marks_name(index);
        let mut last_error = None;
        let attempts = self.settings.retries + 1;

        for attempt in 0..attempts {
            // Exponential backoff before each retry
            if attempt > 0 {
                let delay = retry_delay(self.settings.retry_base_delay, attempt);
                debug!("Retry {} for chunk {} after {:?}", attempt, index, delay);
                tokio::time::sleep(delay).await;
            }

            match load_marks(self.assets.as_ref(), &marks_name, self.settings.line_policy).await {
                Ok(marks) => {
                    // Marks first, then audio, so both come from the same chunk
                    let source = self.audio_source(index, &marks);
                    let words = marks.len();
                    self.track.load(marks, self.settings.hyphen_policy);
                    self.output.load(source);
                    self.output.set_playback_rate(self.settings.base_speed);
                    info!("Loaded chunk {}: {} words", index, words);
                    return Ok(());
                }
                // Keep the last error for the final report
                Err(e) => {
                    warn!("Attempt {} to load chunk {} failed: {}", attempt + 1, index, e);
                    last_error = Some(e);
                }
            }
        }

        Err(WordcastError::ChunkLoad {
            index,
            attempts,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn audio_source(&self, index: usize, marks: &[SpeechMark]) -> AudioSource {
        let name = chunk_audio_name(index, &self.settings.audio_extension);
        let source = AudioSource::new(self.assets.locate(&name));

        let probed = self
            .assets
            .local_path(&name)
            .filter(|_| self.settings.audio_extension.eq_ignore_ascii_case("wav"))
            .and_then(|path| match probe_wav_duration(&path) {
                Ok(duration) => Some(duration),
                Err(e) => {
                    debug!("Could not probe {:?}: {}", path, e);
                    None
                }
            });

        // Without a probe the last word's start is the best length estimate.
        let duration = probed
            .or_else(|| marks.last().map(SpeechMark::time))
            .unwrap_or(Duration::ZERO);
        source.with_duration(duration)
    }

    /// Poll once: show every word the audio has reached.
    pub fn tick(&mut self) {
        if !self.playing {
            return;
        }
        let position = self.output.position();
        self.track.advance(position, &mut self.sink);
        self.sink.show_elapsed(&format_elapsed(self.cumulative + position));
    }

    /// True when the current chunk has finished and needs handling.
    pub fn chunk_finished(&self) -> bool {
        matches!(self.state, SequencerState::Playing { .. }) && self.output.has_ended()
    }

    /// Move on after the current chunk's audio finished.
    pub async fn on_chunk_ended(&mut self) -> Result<&SequencerState> {
        info!("Chunk {} ended", self.chunk_index);

        let played = self
            .output
            .duration()
            .unwrap_or_else(|| self.output.position());
        self.cumulative += played;
        self.chunk_index += 1;

        if self.chunk_index >= self.settings.total_chunks {
            self.enter_exhausted();
            return Ok(&self.state);
        }

        let index = self.chunk_index;
        if let Err(e) = self.load_chunk(index).await {
            self.enter_failed(index, &e);
            return Err(e);
        }

        self.state = SequencerState::Playing { chunk: index };
        if self.playing {
            if let Err(e) = self.output.play() {
                warn!("Could not resume after chunk {}: {}", index, e);
                self.playing = false;
            }
        }
        Ok(&self.state)
    }

    fn enter_exhausted(&mut self) {
        info!("All chunks complete! Waiting for midnight to restart...");
        self.playing = false;
        self.output.pause();
        self.sink.clear();

        let now = self.clock.now();
        let restart_at = day_clock::next_midnight(now);
        info!(
            "Restarting in {} seconds at midnight",
            day_clock::until(now, restart_at).as_secs()
        );
        self.state = SequencerState::Exhausted { restart_at };
    }

    fn enter_failed(&mut self, chunk: usize, e: &WordcastError) {
        error!("Error loading chunk {}: {}", chunk, e);
        self.playing = false;
        self.output.pause();
        self.sink.clear();
        self.sink.show_error(&e.to_string());
        let restart_at = day_clock::next_midnight(self.clock.now());
        self.state = SequencerState::Failed { chunk, restart_at };
    }

    /// When the pending midnight restart is due, if one is scheduled.
    pub fn restart_at(&self) -> Option<NaiveDateTime> {
        match self.state {
            SequencerState::Exhausted { restart_at } | SequencerState::Failed { restart_at, .. } => {
                Some(restart_at)
            }
            _ => None,
        }
    }

    /// Time left before the scheduled restart.
    pub fn restart_in(&self) -> Option<Duration> {
        self.restart_at()
            .map(|deadline| day_clock::until(self.clock.now(), deadline))
    }

    /// Fire the midnight restart: re-sync to the clock and play.
    pub async fn restart(&mut self) -> Result<()> {
        info!("Midnight restart");
        self.cumulative = Duration::ZERO;
        self.chunk_index = 0;
        self.initialize().await?;
        self.play()
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.output.is_muted();
        self.output.set_muted(muted);
        muted
    }
}

/// `base * 2^(attempt-1)`, saturating instead of overflowing.
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
