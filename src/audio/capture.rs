//! Live audio capture
//!
//! The cpal stream lives on its own thread and pushes mono i16 blocks into a
//! bounded channel. Readers block on that channel until a full buffer is
//! available. Dropping the capture stops the stream and joins the thread.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::device::InputDevice;
use crate::audio::source::ChunkSource;
use crate::error::AudioError;

/// Capacity of the callback-to-reader channel, in callback blocks
const BLOCK_QUEUE_CAPACITY: usize = 64;

/// A device delivering mono 16-bit PCM on demand
pub trait CaptureDevice {
    /// Sample rate of the delivered PCM
    fn sample_rate(&self) -> u32;

    /// Block until `buf` is completely filled
    fn read(&mut self, buf: &mut [i16]) -> Result<(), AudioError>;
}

/// cpal-backed capture device
pub struct CpalCapture {
    device_name: String,
    sample_rate: u32,
    timeout: Duration,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    sample_rx: Receiver<Vec<i16>>,
    error_rx: Receiver<AudioError>,
    pending: VecDeque<i16>,
    /// Blocks dropped because the reader fell behind
    overflows: Arc<AtomicU64>,
}

impl CpalCapture {
    /// Open `device` and start streaming at `sample_rate`.
    ///
    /// Returns once the stream is playing, or with the error that kept it
    /// from starting.
    pub fn open(device: InputDevice, sample_rate: u32, timeout: Duration) -> Result<Self, AudioError> {
        let device_name = device.name.clone();
        let default_config = device.default_input_config()?;
        let sample_format = default_config.sample_format();
        let channels = default_config.channels();

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sample_tx, sample_rx) = bounded::<Vec<i16>>(BLOCK_QUEUE_CAPACITY);
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);

        let running = Arc::new(AtomicBool::new(true));
        let running_for_loop = running.clone();
        let overflows = Arc::new(AtomicU64::new(0));
        let overflows_for_cb = overflows.clone();

        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let cpal_device = device.into_inner();
                let sink = BlockSink {
                    channels: channels as usize,
                    sample_tx,
                    overflows: overflows_for_cb,
                };

                let stream = match sample_format {
                    cpal::SampleFormat::F32 => build_stream::<f32>(&cpal_device, &config, sink, error_tx),
                    cpal::SampleFormat::I16 => build_stream::<i16>(&cpal_device, &config, sink, error_tx),
                    cpal::SampleFormat::I32 => build_stream::<i32>(&cpal_device, &config, sink, error_tx),
                    cpal::SampleFormat::U16 => build_stream::<u16>(&cpal_device, &config, sink, error_tx),
                    other => Err(AudioError::UnsupportedFormat(format!(
                        "capture sample format {:?}",
                        other
                    ))),
                };

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep thread alive while running
                while running_for_loop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }

                // Stream is dropped here, stopping capture
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let started = ready_rx
            .recv()
            .map_err(|_| AudioError::StreamError("capture thread exited".into()))
            .and_then(|r| r);

        let mut capture = Self {
            device_name,
            sample_rate,
            timeout,
            running,
            thread_handle: Some(handle),
            sample_rx,
            error_rx,
            pending: VecDeque::new(),
            overflows,
        };

        match started {
            Ok(()) => {
                tracing::info!(
                    "Capture started on '{}': {} Hz, {} device channel(s), {:?}",
                    capture.device_name,
                    sample_rate,
                    channels,
                    sample_format
                );
                Ok(capture)
            }
            Err(e) => {
                capture.stop();
                Err(e)
            }
        }
    }

    /// Stop the stream and join the capture thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::debug!("Capture on '{}' stopped", self.device_name);

            let overflows = self.overflow_count();
            if overflows > 0 {
                tracing::warn!("Capture dropped {} blocks while the sender fell behind", overflows);
            }
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Number of callback blocks dropped because the reader fell behind
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}

impl CaptureDevice for CpalCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, buf: &mut [i16]) -> Result<(), AudioError> {
        while self.pending.len() < buf.len() {
            match self.error_rx.try_recv() {
                Ok(e) => return Err(e),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    return Err(AudioError::StreamError("capture stream closed".into()))
                }
            }

            match self.sample_rx.recv_timeout(self.timeout) {
                Ok(block) => self.pending.extend(block),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(AudioError::CaptureTimeout(self.timeout.as_millis() as u64))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(AudioError::StreamError("capture stream closed".into()))
                }
            }
        }

        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Callback-side half of the capture channel
struct BlockSink {
    channels: usize,
    sample_tx: Sender<Vec<i16>>,
    overflows: Arc<AtomicU64>,
}

impl BlockSink {
    /// Keep the first channel of each interleaved frame, narrowed to i16
    fn push<T>(&self, data: &[T])
    where
        T: Sample,
        i16: FromSample<T>,
    {
        let block: Vec<i16> = data
            .chunks(self.channels.max(1))
            .map(|frame| i16::from_sample(frame[0]))
            .collect();

        if self.sample_tx.try_send(block).is_err() {
            self.overflows.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    sink: BlockSink,
    error_tx: Sender<AudioError>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| sink.push(data),
            move |err| {
                let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))
}

/// Session-bounded chunk source over a capture device.
///
/// The session clock starts with the first chunk request. Before each read
/// the elapsed time is checked; once the session is over the source ends.
pub struct LiveSource<D> {
    device: D,
    buffer_size: usize,
    session: Duration,
    started: Option<Instant>,
    chunks_read: u64,
}

impl<D: CaptureDevice> LiveSource<D> {
    pub fn new(device: D, buffer_size: usize, session: Duration) -> Self {
        Self {
            device,
            buffer_size,
            session,
            started: None,
            chunks_read: 0,
        }
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Release the source, returning the device
    pub fn into_device(self) -> D {
        self.device
    }
}

impl<D: CaptureDevice> ChunkSource for LiveSource<D> {
    fn sample_rate(&self) -> u32 {
        self.device.sample_rate()
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError> {
        let started = *self.started.get_or_insert_with(Instant::now);
        if started.elapsed() >= self.session {
            tracing::info!(
                "Session of {:?} finished after {} chunks",
                self.session,
                self.chunks_read
            );
            return Ok(None);
        }

        let mut chunk = vec![0i16; self.buffer_size];
        self.device.read(&mut chunk)?;
        self.chunks_read += 1;
        Ok(Some(chunk))
    }
}
