use crate::config::Config;
use crate::error::Result;
use crate::marks::{load_marks, AssetSource, SpeechMark};
use crate::playback::{format_elapsed, AudioOutput, AudioSource, DisplaySink, WordTrack};
use std::time::Duration;
use tracing::{error, info, warn};

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 3.0;

/// Transport state of a [`TrackPlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Paused,
    Playing,
    /// Finished; waiting out the pause before starting over.
    LoopPause,
}

/// Position readout for the transport bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub elapsed: String,
    pub total: String,
    pub percent: f64,
}

/// Plays one narration file with manual transport controls.
pub struct TrackPlayer<O, D> {
    output: O,
    sink: D,
    track: WordTrack,
    state: PlayerState,
    resync_interval: Duration,
    loop_pause: Duration,
}

impl<O, D> TrackPlayer<O, D>
where
    O: AudioOutput,
    D: DisplaySink,
{
    pub fn new(config: &Config, output: O, sink: D) -> Self {
        Self {
            output,
            sink,
            track: WordTrack::default(),
            state: PlayerState::Paused,
            resync_interval: config.resync_interval(),
            loop_pause: config.loop_pause(),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
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

    pub fn track(&self) -> &WordTrack {
        &self.track
    }

    pub fn loop_pause(&self) -> Duration {
        self.loop_pause
    }

    /// Load the speech marks and the audio they belong to.
    ///
    /// An audio source without a duration is assumed to end at the last mark.
    ///
    /// A failure is shown on the display as well as returned.
    pub async fn load(
        &mut self,
        assets: &dyn AssetSource,
        marks_name: &str,
        audio: AudioSource,
        config: &Config,
    ) -> Result<usize> {
        let marks = match load_marks(assets, marks_name, config.line_policy).await {
            Ok(marks) => marks,
            Err(e) => {
                error!("Error loading speech marks: {}", e);
                self.sink
                    .show_error("Could not load speech marks file. Check the path!");
                return Err(e);
            }
        };

        // Without a known length, assume the audio stops at the last word.
        let audio = match audio.duration {
            Some(_) => audio,
            None => {
                let estimate = marks.last().map(SpeechMark::time).unwrap_or(Duration::ZERO);
                audio.with_duration(estimate)
            }
        };

        let words = marks.len();
        info!("Loaded {} words", words);
        self.track = WordTrack::new(marks);
        self.output.load(audio);
        self.state = PlayerState::Paused;
        Ok(words)
    }

    /// Play if paused, pause if playing. Returns whether it is now playing.
    pub fn toggle_play(&mut self) -> Result<bool> {
        match self.state {
            PlayerState::Playing => {
                self.output.pause();
                self.state = PlayerState::Paused;
                Ok(false)
            }
            PlayerState::Paused | PlayerState::LoopPause => {
                if let Err(e) = self.output.play() {
                    warn!("Playback blocked: {}", e);
                    return Err(e);
                }
                self.state = PlayerState::Playing;
                Ok(true)
            }
        }
    }

    /// Set the playback rate, clamped to the slider's range.
    ///
    /// A non-finite value is ignored and the current rate is kept.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if !speed.is_finite() {
            warn!("Ignoring invalid speed {}", speed);
            return self.output.playback_rate();
        }
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.output.set_playback_rate(speed);
        speed
    }

    pub fn speed_label(&self) -> String {
        format!("{:.1}x", self.output.playback_rate())
    }

    /// Jump to `percent` of the way through the audio.
    pub fn scrub(&mut self, percent: f64) {
        if !percent.is_finite() {
            warn!("Ignoring invalid scrub position {}", percent);
            return;
        }
        let Some(total) = self.output.duration() else {
            return;
        };
        let target = total.mul_f64(percent.clamp(0.0, 100.0) / 100.0);
        self.output.seek(target);
        self.track.seek(target, &mut self.sink);
    }

    /// Poll once: re-sync if due, then show every word reached.
    pub fn tick(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        let position = self.output.position();
        if self.track.resync(position, self.resync_interval) {
            info!("Re-syncing at {}ms", position.as_millis());
        }
        self.track.advance(position, &mut self.sink);
        self.sink.show_elapsed(&format_elapsed(position));
    }

    pub fn finished(&self) -> bool {
        self.state == PlayerState::Playing && self.output.has_ended()
    }

    /// Handle the end of the audio. Returns how long to wait before looping.
    pub fn on_ended(&mut self) -> Duration {
        info!(
            "Audio ended, waiting {} seconds...",
            self.loop_pause.as_secs()
        );
        self.track.reset();
        self.sink.clear();
        self.state = PlayerState::LoopPause;
        self.loop_pause
    }

    /// Start again from the top after the loop pause.
    pub fn restart_loop(&mut self) -> Result<()> {
        self.output.seek(Duration::ZERO);
        self.output.play()?;
        self.state = PlayerState::Playing;
        Ok(())
    }

    pub fn timeline(&self) -> Timeline {
        let position = self.output.position();
        let (total, percent) = match self.output.duration() {
            Some(total) if !total.is_zero() => (
                format_elapsed(total),
                position.as_secs_f64() / total.as_secs_f64() * 100.0,
            ),
            _ => (format_elapsed(Duration::ZERO), 0.0),
        };
        Timeline {
            elapsed: format_elapsed(position),
            total,
            percent,
        }
    }
}
