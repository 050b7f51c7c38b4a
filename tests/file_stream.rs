//! End-to-end streaming of WAV files over loopback UDP

use std::net::UdpSocket;
use std::path::Path;
use std::time::Duration;

use udp_audio_streamer::{
    audio::{ChunkSource, RecordingSource, WavFileSource},
    codec::OpusEncoder,
    config::{NetworkConfig, OpusConfig},
    network::{Observation, StreamMonitor, UdpSender},
    pipeline::{Pipeline, PipelineStats},
    protocol::{MessageType, Packet, Sequencer, HEADER_LEN, SIGNATURE},
};

fn write_tone(path: &Path, samples: usize, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..samples {
        let t = i as f32 / sample_rate as f32;
        let s = (t * 330.0 * 2.0 * std::f32::consts::PI).sin() * 10000.0;
        writer.write_sample(s as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn collector() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    socket
}

fn drain(socket: &UdpSocket) -> Vec<Vec<u8>> {
    let mut datagrams = Vec::new();
    let mut buf = [0u8; 2048];
    while let Ok(n) = socket.recv(&mut buf) {
        datagrams.push(buf[..n].to_vec());
    }
    datagrams
}

fn run_file<S: ChunkSource>(
    source: &mut S,
    stream_id: u32,
    collector: &UdpSocket,
) -> PipelineStats {
    let config = NetworkConfig {
        server_addr: collector.local_addr().unwrap().to_string(),
        send_buffer_size: None,
    };
    let sample_rate = source.sample_rate();
    let encoder = OpusEncoder::new(sample_rate, &OpusConfig::default()).unwrap();
    let sender = UdpSender::connect(&config).unwrap();
    let sequencer = Sequencer::new(stream_id, sample_rate, SIGNATURE);

    let mut pipeline = Pipeline::new(encoder, sequencer, sender);
    pipeline.run(source).unwrap()
}

#[test]
fn two_frame_file_emits_two_packets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_frames.wav");
    write_tone(&path, 2 * 960, 48000);

    let socket = collector();
    let mut source = WavFileSource::open(&path, 960).unwrap();
    let stats = run_file(&mut source, 7, &socket);

    assert_eq!(stats.chunks_read, 2);
    assert_eq!(stats.packets_sent, 2);

    let datagrams = drain(&socket);
    assert_eq!(datagrams.len(), 2);

    for (expected_frame, datagram) in datagrams.iter().enumerate() {
        let packet = Packet::decode(datagram).unwrap();
        assert_eq!(packet.signature, SIGNATURE);
        assert_eq!(packet.message_type, MessageType::Audio);
        assert_eq!(packet.stream_id, 7);
        assert_eq!(packet.sample_rate, 48000);
        assert_eq!(packet.frame_number, expected_frame as u32);
        assert_eq!(packet.frame_length() as usize, datagram.len() - HEADER_LEN);
        assert!(!packet.frame.is_empty());
        assert!(packet.frame.len() <= 1024);
    }
}

#[test]
fn short_tail_is_skipped_and_numbering_stays_dense() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tail.wav");
    write_tone(&path, 3 * 960 + 400, 48000);

    let socket = collector();
    let mut source = WavFileSource::open(&path, 960).unwrap();
    let stats = run_file(&mut source, 12, &socket);

    assert_eq!(stats.chunks_read, 4);
    assert_eq!(stats.encode_failures, 1);
    assert_eq!(stats.packets_sent, 3);

    let mut monitor = StreamMonitor::new();
    let observations: Vec<Observation> = drain(&socket)
        .iter()
        .map(|d| monitor.observe(&Packet::decode(d).unwrap()))
        .collect();
    assert_eq!(
        observations,
        vec![Observation::NewStream, Observation::InOrder, Observation::InOrder]
    );
    assert_eq!(monitor.stream(12).unwrap().lost, 0);
}

#[test]
fn recording_tee_matches_streamed_audio() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_tone(&input, 4 * 320, 16000);

    let socket = collector();
    let source = WavFileSource::open(&input, 320).unwrap();
    let mut recorder = RecordingSource::create(source, &output).unwrap();
    let stats = run_file(&mut recorder, 1, &socket);
    recorder.finish().unwrap();

    assert_eq!(stats.packets_sent, 4);
    assert_eq!(drain(&socket).len(), 4);

    let original: Vec<i16> = hound::WavReader::open(&input)
        .unwrap()
        .into_samples::<i16>()
        .map(Result::unwrap)
        .collect();
    let recorded: Vec<i16> = hound::WavReader::open(&output)
        .unwrap()
        .into_samples::<i16>()
        .map(Result::unwrap)
        .collect();
    assert_eq!(recorded, original);
}

#[test]
fn missing_file_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    assert!(WavFileSource::open(dir.path().join("absent.wav"), 960).is_err());
}
