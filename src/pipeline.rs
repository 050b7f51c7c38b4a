//! Stream pipeline
//!
//! Pulls chunks from a source and pushes each one through compression,
//! sequencing, framing and sending before asking for the next. Source
//! errors end the run; compression and send errors only skip the chunk.

use bytes::BytesMut;

use crate::audio::ChunkSource;
use crate::codec::Compressor;
use crate::error::Error;
use crate::network::Transport;
use crate::protocol::Sequencer;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub chunks_read: u64,
    pub frames_encoded: u64,
    pub encode_failures: u64,
    pub packets_sent: u64,
    pub send_failures: u64,
    /// Compressed payload bytes handed to the transport
    pub payload_bytes: u64,
    /// Datagram bytes the transport accepted
    pub bytes_sent: u64,
}

/// One stream, end to end
pub struct Pipeline<C, T> {
    compressor: C,
    sequencer: Sequencer,
    transport: T,
    stats: PipelineStats,
    buffer: BytesMut,
}

impl<C: Compressor, T: Transport> Pipeline<C, T> {
    pub fn new(compressor: C, sequencer: Sequencer, transport: T) -> Self {
        Self {
            compressor,
            sequencer,
            transport,
            stats: PipelineStats::default(),
            buffer: BytesMut::new(),
        }
    }

    /// Drive `source` to completion
    pub fn run<S: ChunkSource>(&mut self, source: &mut S) -> Result<PipelineStats, Error> {
        tracing::info!(
            "Streaming stream {} at {} Hz",
            self.sequencer.stream_id(),
            self.sequencer.sample_rate()
        );

        while let Some(chunk) = source.next_chunk()? {
            self.process_chunk(&chunk);
        }

        tracing::info!(
            "Stream {} done: {} chunks, {} packets sent, {} encode failures, {} send failures",
            self.sequencer.stream_id(),
            self.stats.chunks_read,
            self.stats.packets_sent,
            self.stats.encode_failures,
            self.stats.send_failures
        );

        Ok(self.stats.clone())
    }

    /// Compress, frame and send a single chunk
    pub fn process_chunk(&mut self, chunk: &[i16]) {
        self.stats.chunks_read += 1;

        let frame = match self.compressor.compress(chunk) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.encode_failures += 1;
                tracing::warn!(
                    "Could not encode chunk {} ({} samples): {}",
                    self.stats.chunks_read - 1,
                    chunk.len(),
                    e
                );
                return;
            }
        };
        self.stats.frames_encoded += 1;
        debug_assert!(frame.len() <= self.compressor.max_frame_bytes());

        let packet = self.sequencer.next_packet(frame);
        self.buffer.clear();
        packet.encode_into(&mut self.buffer);

        match self.transport.send(&self.buffer) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.payload_bytes += packet.frame.len() as u64;
                self.stats.bytes_sent += n as u64;
                tracing::debug!(
                    "Sent frame {} ({} bytes payload)",
                    packet.frame_number,
                    packet.frame_length()
                );
            }
            Err(e) => {
                self.stats.send_failures += 1;
                tracing::warn!("Failed to send frame {}: {}", packet.frame_number, e);
            }
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }
}
