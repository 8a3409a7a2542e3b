pub mod config;
pub mod error;
pub mod marks;
pub mod playback;
pub mod player;
pub mod runtime;
pub mod schedule;

pub use config::Config;
pub use error::{Result, WordcastError};
pub use player::{PlayerState, Timeline, TrackPlayer};
pub use runtime::{run_broadcast, run_player, shutdown_channel};
pub use schedule::{ChunkSequencer, SequencerState};
