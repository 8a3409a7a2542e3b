use std::time::Duration;

/// A point inside the chunked program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPosition {
    pub index: usize,
    pub offset: Duration,
}

/// Maps a cumulative content position onto a chunk and an offset within it.
pub trait ChunkLocator: Send + Sync {
    fn locate(&self, position: Duration) -> ChunkPosition;

    /// Cumulative content time at which chunk `index` starts.
    fn chunk_start(&self, index: usize) -> Duration;

    fn total_chunks(&self) -> usize;
}

/// Treats every chunk as the average length.
///
/// Offsets are only exact for uniform chunks; joining "near" the live
/// position is all the broadcast needs.
#[derive(Debug, Clone)]
pub struct AverageChunkLocator {
    total_chunks: usize,
    average_secs: f64,
}

impl AverageChunkLocator {
    pub fn new(total_chunks: usize, average_secs: f64) -> Self {
        Self {
            total_chunks: total_chunks.max(1),
            average_secs,
        }
    }

    pub fn average(&self) -> Duration {
        Duration::from_secs_f64(self.average_secs)
    }
}

impl ChunkLocator for AverageChunkLocator {
    /// `index = floor(position / average)`, `offset = position mod average`.
    ///
    /// Past the last chunk the index clamps to the last chunk and the offset
    /// is measured from that chunk's start instead of wrapping, so a position
    /// in the silence before midnight lands past the end of the audio rather
    /// than replaying it.
    fn locate(&self, position: Duration) -> ChunkPosition {
        let target = position.as_secs_f64();
        let estimated = (target / self.average_secs).floor() as usize;
        let last = self.total_chunks - 1;

        if estimated > last {
            // Past the end of the program: stay on the last chunk.
            return ChunkPosition {
                index: last,
                offset: position.saturating_sub(self.chunk_start(last)),
            };
        }

        ChunkPosition {
            index: estimated,
            offset: Duration::from_secs_f64(target % self.average_secs),
        }
    }

    fn chunk_start(&self, index: usize) -> Duration {
        Duration::from_secs_f64(index as f64 * self.average_secs)
    }

    fn total_chunks(&self) -> usize {
        self.total_chunks
    }
}

/// Exact locator built from the real length of every chunk.
#[derive(Debug, Clone)]
pub struct CumulativeChunkLocator {
    starts: Vec<Duration>,
}

impl CumulativeChunkLocator {
    pub fn from_durations(durations: &[Duration]) -> Self {
        let mut starts = Vec::with_capacity(durations.len().max(1));
        let mut cumulative = Duration::ZERO;
        for duration in durations {
            starts.push(cumulative);
            cumulative += *duration;
        }
        if starts.is_empty() {
            starts.push(Duration::ZERO);
        }
        Self { starts }
    }
}

impl ChunkLocator for CumulativeChunkLocator {
    fn locate(&self, position: Duration) -> ChunkPosition {
        let index = self
            .starts
            .partition_point(|start| *start <= position)
            .saturating_sub(1);
        ChunkPosition {
            index,
            offset: position.saturating_sub(self.starts[index]),
        }
    }

    fn chunk_start(&self, index: usize) -> Duration {
        self.starts[index.min(self.starts.len() - 1)]
    }

    fn total_chunks(&self) -> usize {
        self.starts.len()
    }
}
