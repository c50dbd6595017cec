// Integration tests for audio extraction: real-time pacing, channel
// downmix, and decoding of real WAV data through symphonia.

use std::io::Cursor;
use std::time::Duration;

use viva::error::AssessmentError;
use viva::media::{
    AudioExtractor, AudioPacket, DecodedAudio, DeviceBackend, FakeBackend, MediaArtifact,
    MediaBackend, MediaKind,
};

fn wav_samples(artifact: &MediaArtifact) -> (hound::WavSpec, Vec<i16>) {
    let reader = hound::WavReader::new(Cursor::new(artifact.data().to_vec())).unwrap();
    let spec = reader.spec();
    let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

#[tokio::test(start_paused = true)]
async fn extraction_takes_as_long_as_the_source_plays() {
    let backend = FakeBackend::new().with_decoded(DecodedAudio {
        sample_rate: 16000,
        channels: 1,
        packets: vec![
            AudioPacket {
                offset: Duration::ZERO,
                samples: vec![1i16; 16000],
            },
            AudioPacket {
                offset: Duration::from_secs(1),
                samples: vec![2i16; 16000],
            },
        ],
    });
    let extractor = AudioExtractor::new(&backend);
    let source = MediaArtifact::new(MediaKind::Video, vec![0; 256]);

    let started = tokio::time::Instant::now();
    let audio = extractor.extract(&source).await.unwrap();

    // Play-through decode is duration-bound: two seconds of media take two
    // seconds of (virtual) wall clock
    assert!(started.elapsed() >= Duration::from_secs(2));

    assert_eq!(audio.kind(), MediaKind::Audio);
    let (spec, samples) = wav_samples(&audio);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(samples.len(), 32000);
}

#[tokio::test(start_paused = true)]
async fn stereo_sources_are_downmixed_to_mono() {
    let backend = FakeBackend::new().with_decoded(DecodedAudio {
        sample_rate: 8000,
        channels: 2,
        packets: vec![AudioPacket {
            offset: Duration::ZERO,
            samples: vec![100, 200, 300, 500],
        }],
    });
    let extractor = AudioExtractor::new(&backend);
    let source = MediaArtifact::new(MediaKind::Video, vec![0; 16]);

    let audio = extractor.extract(&source).await.unwrap();
    let (spec, samples) = wav_samples(&audio);
    assert_eq!(spec.channels, 1);
    assert_eq!(samples, vec![150, 400]);
}

#[tokio::test]
async fn corrupt_sources_fail_with_decode_error() {
    let backend = FakeBackend::new().failing_decode("no decodable audio track");
    let extractor = AudioExtractor::new(&backend);
    let source = MediaArtifact::new(MediaKind::Video, vec![0xde, 0xad]);

    let err = extractor.extract(&source).await.unwrap_err();
    assert!(matches!(err, AssessmentError::Decode(_)));
}

#[tokio::test(start_paused = true)]
async fn real_wav_data_round_trips_through_the_device_backend() {
    // Build a real 8kHz mono WAV in memory
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut data = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut data), spec).unwrap();
        for i in 0..400i32 {
            writer.write_sample((i * 20) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    let source = MediaArtifact::new(MediaKind::Video, data);

    let backend = DeviceBackend::new();
    let decoded = backend.decode_audio(&source).unwrap();
    assert_eq!(decoded.sample_rate, 8000);
    let total: usize = decoded.packets.iter().map(|p| p.samples.len()).sum();
    assert_eq!(total, 400);

    let extractor = AudioExtractor::new(&backend);
    let audio = extractor.extract(&source).await.unwrap();
    let (out_spec, samples) = wav_samples(&audio);
    assert_eq!(out_spec.sample_rate, 8000);
    assert_eq!(samples.len(), 400);
    assert_eq!(samples[1], 20);
}

#[tokio::test]
async fn garbage_bytes_are_rejected_by_the_real_decoder() {
    let backend = DeviceBackend::new();
    let source = MediaArtifact::new(MediaKind::Video, vec![0x00, 0x01, 0x02, 0x03, 0x04]);
    let err = backend.decode_audio(&source).unwrap_err();
    assert!(matches!(err, AssessmentError::Decode(_)));
}
