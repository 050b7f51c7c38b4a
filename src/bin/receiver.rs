//! Audio Receiver Probe
//!
//! Listens for streamer packets, validates them and reports per-stream
//! loss and reordering. It does not play audio.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use udp_audio_streamer::{
    codec::OpusDecoder,
    config::StreamerConfig,
    network::{bind_socket, Observation, PacketReceiver, StreamMonitor},
    protocol::Packet,
};

#[derive(Parser)]
#[command(name = "receiver")]
#[command(about = "Validate and monitor incoming audio streams", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8081")]
    listen: SocketAddr,

    /// Configuration file (TOML), for the protocol signature
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decode every Opus payload to check it
    #[arg(long)]
    decode: bool,

    /// Seconds between stats reports
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,

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

    let config = StreamerConfig::load(cli.config.as_deref())?;

    let socket = bind_socket(cli.listen, None).context("Failed to bind receiver socket")?;
    socket
        .set_read_timeout(Some(Duration::from_millis(500)))
        .context("Failed to set read timeout")?;
    let mut receiver = PacketReceiver::new(socket, config.protocol.signature);

    tracing::info!("Listening on {}", receiver.local_addr()?);
    tracing::info!("Waiting for audio streams...");

    let mut monitor = StreamMonitor::new();
    let mut decoders: HashMap<u32, OpusDecoder> = HashMap::new();
    let stats_interval = Duration::from_secs(cli.stats_interval.max(1));
    let mut last_stats_time = Instant::now();

    loop {
        match receiver.recv() {
            Ok((from, Ok(packet))) => {
                match monitor.observe(&packet) {
                    Observation::NewStream => tracing::info!(
                        "New stream {} from {} at {} Hz, starting at frame {}",
                        packet.stream_id,
                        from,
                        packet.sample_rate,
                        packet.frame_number
                    ),
                    Observation::InOrder => {}
                    Observation::Gap { missing } => tracing::warn!(
                        "Stream {}: {} frame(s) missing before {}",
                        packet.stream_id,
                        missing,
                        packet.frame_number
                    ),
                    Observation::Late { behind } => tracing::warn!(
                        "Stream {}: frame {} arrived {} late",
                        packet.stream_id,
                        packet.frame_number,
                        behind
                    ),
                }

                if cli.decode {
                    verify_payload(&mut decoders, &packet);
                }
            }
            Ok((from, Err(e))) => {
                tracing::warn!("Malformed packet from {}: {}", from, e);
            }
            // Read timeout; fall through to stats
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                tracing::warn!("Receive error: {}", e);
                std::thread::sleep(Duration::from_millis(100));
            }
        }

        if last_stats_time.elapsed() >= stats_interval {
            last_stats_time = Instant::now();

            let recv_stats = receiver.stats();
            tracing::info!(
                "Receiver stats: {} packets, {} bytes, {} invalid",
                recv_stats.packets_received,
                recv_stats.bytes_received,
                recv_stats.invalid_packets
            );

            for (stream_id, stats) in monitor.streams() {
                tracing::info!(
                    "Stream {} stats: {} received, {} lost ({:.1}% loss), {} late",
                    stream_id,
                    stats.received,
                    stats.lost,
                    stats.loss_rate() * 100.0,
                    stats.late
                );
            }
        }
    }
}

fn verify_payload(decoders: &mut HashMap<u32, OpusDecoder>, packet: &Packet) {
    if !decoders.contains_key(&packet.stream_id) {
        match OpusDecoder::new(packet.sample_rate) {
            Ok(decoder) => {
                decoders.insert(packet.stream_id, decoder);
            }
            Err(e) => {
                tracing::warn!("Stream {}: cannot create decoder: {}", packet.stream_id, e);
                return;
            }
        }
    }

    if let Some(decoder) = decoders.get_mut(&packet.stream_id) {
        match decoder.decode(&packet.frame) {
            Ok(samples) => tracing::debug!(
                "Stream {} frame {}: {} samples",
                packet.stream_id,
                packet.frame_number,
                samples.len()
            ),
            Err(e) => tracing::warn!(
                "Stream {} frame {}: {}",
                packet.stream_id,
                packet.frame_number,
                e
            ),
        }
    }
}
