//! Driving loops for the two players.
//!
//! Everything runs on one task: a fixed-interval tick polls the word track,
//! the ended condition is checked right after each poll, and long waits
//! (loop pause, midnight restart) are plain sleeps. Under a paused tokio
//! runtime the whole schedule is virtual and deterministic.

use crate::error::Result;
use crate::player::{PlayerState, TrackPlayer};
use crate::playback::{format_clock, AudioOutput, DisplaySink};
use crate::schedule::{ChunkSequencer, DayClock, SequencerState};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

const CLOCK_REFRESH: Duration = Duration::from_secs(1);

/// Sender half used to stop a running loop.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Drive a [`TrackPlayer`] until shutdown.
pub async fn run_player<O, D, C>(
    player: &mut TrackPlayer<O, D>,
    clock: &C,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    O: AudioOutput,
    D: DisplaySink,
    C: DayClock,
{
    let mut poll = ticker(tick);
    let mut clock_refresh = ticker(CLOCK_REFRESH);

    loop {
        match player.state() {
            PlayerState::LoopPause => {
                tokio::select! {
                    _ = sleep(player.loop_pause()) => {
                        player.restart_loop()?;
                    }
                    _ = shutdown.changed() => break,
                }
            }
            PlayerState::Playing | PlayerState::Paused => {
                tokio::select! {
                    _ = poll.tick() => {
                        player.tick();
                        if player.finished() {
                            player.on_ended();
                        }
                    }
                    _ = clock_refresh.tick() => {
                        player.sink_mut().show_clock(&format_clock(clock.now().time()));
                    }
                    _ = shutdown.changed() => break,
                }
            }
        }
    }

    info!("Player stopped");
    Ok(())
}

/// Drive a [`ChunkSequencer`] until shutdown.
///
/// Starts by syncing to the time of day. A refused autoplay leaves the
/// sequencer idle; load failures and exhaustion wait for midnight.
pub async fn run_broadcast<O, D, C>(
    sequencer: &mut ChunkSequencer<O, D, C>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    O: AudioOutput,
    D: DisplaySink,
    C: DayClock,
{
    if *sequencer.state() == SequencerState::Uninitialized {
        match sequencer.initialize().await {
            Ok(_) => {
                let _ = sequencer.play();
            }
            Err(e) => warn!("Initial sync failed: {}", e),
        }
    }

    let mut poll = ticker(tick);
    let mut clock_refresh = ticker(CLOCK_REFRESH);

    loop {
        if let Some(wait) = sequencer.restart_in() {
            debug!("Idle for {:?} until restart", wait);
            tokio::select! {
                _ = sleep(wait) => {
                    if let Err(e) = sequencer.restart().await {
                        warn!("Restart failed: {}", e);
                    }
                }
                _ = clock_refresh.tick() => {
                    let now = format_clock(sequencer.clock().now().time());
                    sequencer.sink_mut().show_clock(&now);
                }
                _ = shutdown.changed() => break,
            }
            continue;
        }

        tokio::select! {
            _ = poll.tick() => {
                sequencer.tick();
                if sequencer.chunk_finished() {
                    if let Err(e) = sequencer.on_chunk_ended().await {
                        warn!("Chunk transition failed: {}", e);
                    }
                }
            }
            _ = clock_refresh.tick() => {
                let now = format_clock(sequencer.clock().now().time());
                sequencer.sink_mut().show_clock(&now);
            }
            _ = shutdown.changed() => break,
        }
    }

    info!("Broadcast stopped");
    Ok(())
}
