//! Audio Sender Application
//!
//! Streams a WAV file, or the microphone for a bounded session, to the
//! collector over UDP.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use udp_audio_streamer::{
    audio::{
        device::{list_input_devices, open_input_device},
        ChunkSource, CpalCapture, LiveSource, RecordingSource, WavFileSource,
    },
    codec::OpusEncoder,
    config::StreamerConfig,
    network::UdpSender,
    pipeline::{Pipeline, PipelineStats},
    protocol::Sequencer,
};

#[derive(Parser)]
#[command(name = "sender")]
#[command(about = "Stream Opus audio over UDP", long_about = None)]
#[command(version)]
struct Cli {
    /// Stream identifier carried in every packet
    #[arg(short, long = "stream-id", alias = "streamid", required_unless_present = "list_devices")]
    stream_id: Option<u32>,

    /// WAV file to stream; captures from the microphone when omitted
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collector address, overrides the configuration
    #[arg(long)]
    server: Option<String>,

    /// Live session length in seconds, overrides the configuration
    #[arg(short, long)]
    duration: Option<u64>,

    /// Input device name for live capture
    #[arg(long)]
    device: Option<String>,

    /// Also write the raw PCM to this WAV file
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.list_devices {
        print_devices();
        return Ok(());
    }

    let Some(stream_id) = cli.stream_id else {
        bail!("--stream-id is required");
    };

    let mut config = StreamerConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server.clone() {
        config.network.server_addr = server;
    }
    if let Some(secs) = cli.duration {
        config.audio.session_secs = secs;
    }
    if let Some(device) = cli.device.clone() {
        config.audio.device = Some(device);
    }
    config.validate()?;

    tracing::info!("Starting audio sender for stream {}", stream_id);

    let stats = match &cli.file {
        Some(path) => {
            let source = WavFileSource::open(path, config.audio.frame_size)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            stream(source, stream_id, &config, cli.record.as_deref())?
        }
        None => {
            let device = open_input_device(config.audio.device.as_deref())
                .context("Failed to open input device")?;
            let capture = CpalCapture::open(
                device,
                config.audio.sample_rate,
                config.audio.capture_timeout(),
            )
            .context("Failed to start audio capture")?;

            tracing::info!("Recording for {:?}...", config.audio.session_duration());
            let source = LiveSource::new(
                capture,
                config.audio.frame_size,
                config.audio.session_duration(),
            );
            let stats = stream(source, stream_id, &config, cli.record.as_deref())?;
            tracing::info!("Recording finished.");
            stats
        }
    };

    tracing::info!(
        "Sent {} packets ({:.1} KB) from {} chunks",
        stats.packets_sent,
        stats.bytes_sent as f64 / 1024.0,
        stats.chunks_read
    );

    Ok(())
}

/// Build the stages around `source` and run the stream to completion
fn stream<S: ChunkSource>(
    source: S,
    stream_id: u32,
    config: &StreamerConfig,
    record: Option<&Path>,
) -> Result<PipelineStats> {
    let sample_rate = source.sample_rate();
    config
        .validate_source_rate(sample_rate)
        .context("Source does not fit the configured frame size")?;

    let encoder = OpusEncoder::new(sample_rate, &config.opus)
        .context("Failed to create Opus encoder")?;
    let sender = UdpSender::connect(&config.network).context("Failed to set up UDP socket")?;
    let sequencer = Sequencer::new(stream_id, sample_rate, config.protocol.signature);
    let mut pipeline = Pipeline::new(encoder, sequencer, sender);

    let stats = match record {
        Some(path) => {
            let mut recorder = RecordingSource::create(source, path)?;
            let stats = pipeline.run(&mut recorder);
            // Finalize the WAV even when the stream ended on an error
            recorder.finish()?;
            stats?
        }
        None => {
            let mut source = source;
            pipeline.run(&mut source)?
        }
    };

    let encoder_stats = pipeline.compressor().stats();
    tracing::info!(
        "Encoder: {} frames, avg frame {:.0} bytes",
        encoder_stats.frames_encoded,
        encoder_stats.average_frame_size
    );

    Ok(stats)
}

fn print_devices() {
    println!("\n=== Available Input Devices ===");
    for device in list_input_devices() {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}", device.name, default_marker);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();
}
