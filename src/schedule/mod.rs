pub mod day_clock;
pub mod locate;
pub mod sequencer;

pub use day_clock::{
    next_midnight, position_from_time_of_day, seconds_since_midnight, until_next_midnight,
    DayClock, ManualClock, RuntimeClock, SystemClock,
};
pub use locate::{AverageChunkLocator, ChunkLocator, ChunkPosition, CumulativeChunkLocator};
pub use sequencer::{ChunkSequencer, SequencerSettings, SequencerState};
