use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wordcast::config::Config;
use wordcast::marks::{
    chunk_audio_name, format_marks, parse_marks, rebase_segments, AssetSource, DirSource,
    HttpSource,
};
use wordcast::playback::{format_elapsed, probe_wav_duration, AudioSource, SimulatedOutput, TerminalSink};
use wordcast::schedule::{
    position_from_time_of_day, AverageChunkLocator, ChunkLocator, ChunkSequencer, DayClock,
    SystemClock,
};
use wordcast::{run_broadcast, run_player, shutdown_channel, TrackPlayer};

#[derive(Parser)]
#[command(name = "wordcast")]
#[command(version, about = "Word-by-word narration synchronized to speech marks")]
#[command(long_about = "Plays narrated audio while showing the word being spoken, either for a single file or as a chunked program synchronized to the time of day.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Play a single narration from its speech-mark file
    Play {
        /// Newline-delimited speech-mark file (defaults to the configured one)
        marks: Option<PathBuf>,

        /// Audio file paired with the marks (WAV length is probed)
        #[arg(short, long)]
        audio: Option<PathBuf>,

        /// Audio length in seconds, if it cannot be probed
        #[arg(short, long)]
        duration: Option<f64>,

        /// Playback speed (0.5 to 3.0)
        #[arg(short, long, default_value = "1.0", value_parser = parse_speed)]
        speed: f64,
    },

    /// Run the chunked program synchronized to the time of day
    Broadcast {
        /// Asset directory or base URL (overrides config)
        #[arg(long)]
        assets: Option<String>,

        /// Number of chunks in the program (overrides config)
        #[arg(long)]
        chunks: Option<usize>,
    },

    /// Show which chunk plays at a time of day
    Locate {
        /// Local time as HH:MM:SS (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Rebase a concatenated speech-mark file onto one continuous timeline
    FixMarks {
        input: PathBuf,
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn parse_speed(s: &str) -> std::result::Result<f64, String> {
    let speed: f64 = s
        .parse()
        .map_err(|_| format!("Invalid speed: {}", s))?;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("Invalid speed: {}. Use a positive number", s));
    }
    Ok(speed)
}

fn asset_source(root: &str) -> Box<dyn AssetSource> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Box::new(HttpSource::new(root))
    } else {
        Box::new(DirSource::new(root))
    }
}

fn split_path(path: &Path) -> Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file path: {}", path.display()))?
        .to_string();
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, name))
}

fn audio_for(audio: Option<&Path>, duration: Option<f64>) -> Result<AudioSource> {
    let uri = audio
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "silent".to_string());
    let mut source = AudioSource::new(uri);

    if let Some(secs) = duration {
        anyhow::ensure!(secs >= 0.0 && secs.is_finite(), "Duration must be non-negative");
        source = source.with_duration(Duration::from_secs_f64(secs));
    } else if let Some(path) = audio.filter(|p| p.extension().is_some_and(|e| e == "wav")) {
        let probed = probe_wav_duration(path).context("Failed to read WAV length")?;
        source = source.with_duration(probed);
    }

    Ok(source)
}

async fn play(
    config: &Config,
    marks: &Path,
    audio: Option<&Path>,
    duration: Option<f64>,
    speed: f64,
) -> Result<()> {
    let (dir, name) = split_path(marks)?;
    let assets = DirSource::new(dir);
    let source = audio_for(audio, duration)?;

    let mut player = TrackPlayer::new(config, SimulatedOutput::new(), TerminalSink::new());
    player.load(&assets, &name, source, config).await?;
    let speed = player.set_speed(speed);

    let timeline = player.timeline();
    info!("Playing {} ({}) at {:.1}x", marks.display(), timeline.total, speed);

    player.toggle_play()?;

    let (tx, rx) = shutdown_channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = tx.send(true);
    });

    run_player(&mut player, &SystemClock, config.tick_interval(), rx).await?;
    Ok(())
}

async fn broadcast(config: &Config) -> Result<()> {
    info!("Assets:   {}", config.asset_root);
    info!("Chunks:   {}", config.total_chunks);
    info!("Speed:    {:.4}x", config.base_speed());

    let mut sequencer = ChunkSequencer::new(
        config,
        asset_source(&config.asset_root),
        SimulatedOutput::new(),
        TerminalSink::new(),
        SystemClock,
    );

    let (tx, rx) = shutdown_channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = tx.send(true);
    });

    run_broadcast(&mut sequencer, config.tick_interval(), rx).await?;
    Ok(())
}

fn locate(config: &Config, at: Option<&str>) -> Result<()> {
    let now = SystemClock.now();
    let now = match at {
        Some(text) => {
            let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
                .with_context(|| format!("Invalid time of day: {}", text))?;
            now.date().and_time(time)
        }
        None => now,
    };

    let target = position_from_time_of_day(now, config.base_speed());
    let locator = AverageChunkLocator::new(config.total_chunks, config.average_chunk_secs());
    let position = locator.locate(target);

    info!(
        "At {:02}:{:02}:{:02}: content position {}",
        now.hour(),
        now.minute(),
        now.second(),
        format_elapsed(target)
    );
    info!(
        "Chunk {} ({}) at offset {:.2}s",
        position.index,
        chunk_audio_name(position.index, &config.audio_extension),
        position.offset.as_secs_f64()
    );
    Ok(())
}

async fn fix_marks(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let marks = parse_marks(&input.display().to_string(), &text, config.line_policy)?;
    info!("Total words: {}", marks.len());

    let fixed = rebase_segments(marks);
    tokio::fs::write(output, format_marks(&fixed)?)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(last) = fixed.last() {
        info!(
            "Final timestamp: {}ms = {}",
            last.time_ms,
            format_elapsed(last.time())
        );
    }
    info!("Saved to {}", output.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Play {
            marks,
            audio,
            duration,
            speed,
        } => {
            config.validate().context("Configuration validation failed")?;
            let marks = marks.unwrap_or_else(|| PathBuf::from(&config.marks_file));
            play(&config, &marks, audio.as_deref(), duration, speed).await
        }
        Command::Broadcast { assets, chunks } => {
            if let Some(assets) = assets {
                config.asset_root = assets;
            }
            if let Some(chunks) = chunks {
                config.total_chunks = chunks;
            }
            config.validate().context("Configuration validation failed")?;
            broadcast(&config).await
        }
        Command::Locate { at } => {
            config.validate().context("Configuration validation failed")?;
            locate(&config, at.as_deref())
        }
        Command::FixMarks { input, output } => fix_marks(&config, &input, &output).await,
    }
}
