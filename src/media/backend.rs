//! Host media capabilities behind a swappable backend.
//!
//! Two capabilities are exposed: opening a live capture stream and decoding
//! a finished artifact into timestamped audio packets. [`DeviceBackend`] is
//! the real implementation (cpal for capture, symphonia for decode);
//! [`FakeBackend`] returns canned results deterministically so everything
//! above this layer can be tested without media hardware.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AssessmentError;
use crate::media::artifact::{MediaArtifact, MediaKind};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Requested properties of a capture stream.
#[derive(Debug, Clone)]
pub struct StreamConstraints {
    /// Capture an audio track.
    pub audio: bool,
    /// Capture a video track where the host supports one.
    pub video: bool,
    /// Device name, numeric index, or "default".
    pub device: String,
    /// Requested sample rate in Hz (actual may differ based on device).
    pub sample_rate: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            device: "default".to_string(),
            sample_rate: 16000,
        }
    }
}

/// A live capture stream holding exclusive ownership of the device tracks.
///
/// Tracks are released when the stream is finished, aborted, or dropped,
/// whichever comes first.
pub trait DeviceStream {
    /// Actual sample rate the device is capturing at.
    fn sample_rate(&self) -> u32;

    /// Whether the stream carries a video track.
    fn has_video(&self) -> bool;

    /// Normalized level (0.0 - 1.0) of recently captured audio, for the
    /// live preview.
    fn level(&self) -> f32;

    /// Number of samples captured so far.
    fn captured_samples(&self) -> usize;

    /// Stops capture, releases the device tracks and finalizes the
    /// buffered data into one artifact.
    fn finish(self: Box<Self>) -> Result<MediaArtifact, AssessmentError>;

    /// Stops capture and releases the device tracks, discarding the data.
    fn abort(self: Box<Self>);
}

/// Decoded audio as timestamped packets, ready for real-time replay.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub packets: Vec<AudioPacket>,
}

/// One decoded packet with its offset from the start of the media.
#[derive(Debug, Clone)]
pub struct AudioPacket {
    pub offset: Duration,
    /// Interleaved i16 PCM samples.
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    /// Total play-through duration of the decoded media.
    pub fn duration(&self) -> Duration {
        let Some(last) = self.packets.last() else {
            return Duration::ZERO;
        };
        let frames = last.samples.len() / self.channels.max(1) as usize;
        last.offset + Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Host media capability: live capture plus decode-and-extract.
pub trait MediaBackend: Send + Sync {
    /// Acquires the capture devices described by `constraints`.
    ///
    /// # Errors
    /// - [`AssessmentError::DeviceAccess`] if permissions are denied or no
    ///   matching device exists
    fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn DeviceStream>, AssessmentError>;

    /// Decodes an artifact into replayable audio packets.
    ///
    /// # Errors
    /// - [`AssessmentError::Decode`] if the artifact is corrupt or in an
    ///   unsupported format
    fn decode_audio(&self, artifact: &MediaArtifact) -> Result<DecodedAudio, AssessmentError>;
}

/// Real backend: cpal input devices and symphonia decoding.
///
/// Terminal hosts expose no camera, so streams opened here never carry a
/// video track; `constraints.video` is accepted and ignored.
pub struct DeviceBackend;

impl DeviceBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeviceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for DeviceBackend {
    fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn DeviceStream>, AssessmentError> {
        if !constraints.audio {
            return Err(AssessmentError::DeviceAccess(
                "an audio track is required for capture".to_string(),
            ));
        }

        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if constraints.device == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &constraints.device)
            }
        })
        .map_err(|e| AssessmentError::DeviceAccess(e.to_string()))?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", device_name);

        let device_config = device
            .default_input_config()
            .map_err(|e| AssessmentError::DeviceAccess(e.to_string()))?;
        let sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if sample_rate != constraints.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Capturing at device rate.",
                constraints.sample_rate,
                sample_rate
            );
        }

        let samples: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));
        let samples_arc = Arc::clone(&samples);

        let stream = device
            .build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    downmix_into(data, &samples_arc, num_channels);
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AssessmentError::DeviceAccess(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AssessmentError::DeviceAccess(e.to_string()))?;
        tracing::debug!("Audio stream started ({}Hz, {} channels)", sample_rate, num_channels);

        Ok(Box::new(CpalStream {
            stream: Some(stream),
            samples,
            sample_rate,
        }))
    }

    fn decode_audio(&self, artifact: &MediaArtifact) -> Result<DecodedAudio, AssessmentError> {
        decode_with_symphonia(artifact)
    }
}

/// Stream backed by a live cpal input device.
struct CpalStream {
    stream: Option<cpal::Stream>,
    samples: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalStream {
    fn release_tracks(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Device tracks released");
        }
    }
}

impl DeviceStream for CpalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn has_video(&self) -> bool {
        false
    }

    fn level(&self) -> f32 {
        let samples = self.samples.lock().unwrap();
        let window = samples.len().min(1600);
        if window == 0 {
            return 0.0;
        }
        let tail = &samples[samples.len() - window..];
        let sum: f64 = tail.iter().map(|&s| (s as f64 / i16::MAX as f64).powi(2)).sum();
        (sum / window as f64).sqrt() as f32
    }

    fn captured_samples(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    fn finish(mut self: Box<Self>) -> Result<MediaArtifact, AssessmentError> {
        self.release_tracks();

        let samples = self.samples.lock().unwrap();
        if samples.is_empty() {
            return Ok(MediaArtifact::new(MediaKind::Audio, Vec::new()));
        }

        let duration_secs = samples.len() as f32 / self.sample_rate as f32;
        tracing::info!(
            "Capture stopped: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            samples.len(),
            self.sample_rate
        );

        let data = encode_wav(&samples, self.sample_rate)
            .map_err(|e| AssessmentError::Decode(format!("failed to encode capture: {e}")))?;
        Ok(MediaArtifact::new(MediaKind::Audio, data))
    }

    fn abort(mut self: Box<Self>) {
        self.release_tracks();
        tracing::debug!("Capture aborted, buffered samples discarded");
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.release_tracks();
    }
}

/// Folds a multi-channel callback buffer into the mono sample store.
fn downmix_into(data: &[i16], samples_arc: &Arc<Mutex<Vec<i16>>>, num_channels: usize) {
    let mut samples = samples_arc.lock().unwrap();
    match num_channels {
        0 | 1 => samples.extend_from_slice(data),
        n => {
            for chunk in data.chunks_exact(n) {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                samples.push((sum / n as i32) as i16);
            }
        }
    }
}

/// Encodes mono i16 samples as an in-memory WAV blob.
pub(crate) fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut data = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut data);
        let mut writer = hound::WavWriter::new(cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(data)
}

/// Decodes an artifact with symphonia into timestamped packets.
fn decode_with_symphonia(artifact: &MediaArtifact) -> Result<DecodedAudio, AssessmentError> {
    let cursor = std::io::Cursor::new(artifact.data().to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AssessmentError::Decode(format!("unsupported media format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AssessmentError::Decode("no decodable audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let time_base = codec_params.time_base;

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AssessmentError::Decode("audio track has no sample rate".to_string()))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1) as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AssessmentError::Decode(format!("unsupported audio codec: {e}")))?;

    let mut packets = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;
    let mut decoded_frames: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AssessmentError::Decode(format!("error reading media: {e}")));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let offset = match time_base {
            Some(tb) => {
                let time = tb.calc_time(packet.ts());
                Duration::from_secs_f64(time.seconds as f64 + time.frac)
            }
            None => Duration::from_secs_f64(decoded_frames as f64 / sample_rate as f64),
        };

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Skip over damaged packets, keep the stream going
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(AssessmentError::Decode(format!("decode error: {e}"))),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();

        let sbuf =
            sample_buf.get_or_insert_with(|| SampleBuffer::<i16>::new(num_frames as u64, spec));
        if sbuf.capacity() < num_frames {
            *sbuf = SampleBuffer::<i16>::new(num_frames as u64, spec);
        }

        sbuf.copy_interleaved_ref(decoded);
        let samples = sbuf.samples().to_vec();
        decoded_frames += (samples.len() / channels.max(1) as usize) as u64;
        packets.push(AudioPacket { offset, samples });
    }

    if packets.is_empty() {
        return Err(AssessmentError::Decode(
            "media contained no decodable audio".to_string(),
        ));
    }

    Ok(DecodedAudio {
        sample_rate,
        channels,
        packets,
    })
}

/// Deterministic backend for tests and offline development.
///
/// Streams finish into queued canned artifacts (an empty audio artifact
/// when the queue is exhausted) and decoding returns a configured canned
/// result.
pub struct FakeBackend {
    deny_devices: Option<String>,
    decode_error: Option<String>,
    decoded: Option<DecodedAudio>,
    report_video: bool,
    recordings: Arc<Mutex<VecDeque<MediaArtifact>>>,
    open_streams: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            deny_devices: None,
            decode_error: None,
            decoded: None,
            report_video: false,
            recordings: Arc::new(Mutex::new(VecDeque::new())),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues an artifact to be returned by the next finished stream.
    pub fn with_recording(self, artifact: MediaArtifact) -> Self {
        self.recordings.lock().unwrap().push_back(artifact);
        self
    }

    /// Makes `open_stream` fail as if device permissions were denied.
    pub fn deny_devices(mut self, message: &str) -> Self {
        self.deny_devices = Some(message.to_string());
        self
    }

    /// Makes `decode_audio` fail as if the artifact were corrupt.
    pub fn failing_decode(mut self, message: &str) -> Self {
        self.decode_error = Some(message.to_string());
        self
    }

    /// Sets the canned decode result.
    pub fn with_decoded(mut self, decoded: DecodedAudio) -> Self {
        self.decoded = Some(decoded);
        self
    }

    /// Reports streams as carrying a video track.
    pub fn reporting_video(mut self) -> Self {
        self.report_video = true;
        self
    }

    /// Number of streams that are open and not yet released.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for FakeBackend {
    fn open_stream(
        &self,
        _constraints: &StreamConstraints,
    ) -> Result<Box<dyn DeviceStream>, AssessmentError> {
        if let Some(message) = &self.deny_devices {
            return Err(AssessmentError::DeviceAccess(message.clone()));
        }
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            recordings: Arc::clone(&self.recordings),
            open_streams: Arc::clone(&self.open_streams),
            report_video: self.report_video,
            released: false,
        }))
    }

    fn decode_audio(&self, _artifact: &MediaArtifact) -> Result<DecodedAudio, AssessmentError> {
        if let Some(message) = &self.decode_error {
            return Err(AssessmentError::Decode(message.clone()));
        }
        Ok(self.decoded.clone().unwrap_or_else(|| DecodedAudio {
            sample_rate: 16000,
            channels: 1,
            packets: vec![AudioPacket {
                offset: Duration::ZERO,
                samples: vec![0i16; 160],
            }],
        }))
    }
}

struct FakeStream {
    recordings: Arc<Mutex<VecDeque<MediaArtifact>>>,
    open_streams: Arc<AtomicUsize>,
    report_video: bool,
    released: bool,
}

impl FakeStream {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl DeviceStream for FakeStream {
    fn sample_rate(&self) -> u32 {
        16000
    }

    fn has_video(&self) -> bool {
        self.report_video
    }

    fn level(&self) -> f32 {
        0.5
    }

    fn captured_samples(&self) -> usize {
        160
    }

    fn finish(mut self: Box<Self>) -> Result<MediaArtifact, AssessmentError> {
        self.release();
        let next = self.recordings.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| MediaArtifact::new(MediaKind::Audio, Vec::new())))
    }

    fn abort(mut self: Box<Self>) {
        self.release();
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Finds an audio input device by name or numeric index.
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> anyhow::Result<cpal::Device> {
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();

        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        }
        return Err(anyhow!(
            "Device index {} is out of range (0-{})",
            index,
            devices.len().saturating_sub(1)
        ));
    }

    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'viva list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library
/// warnings on Linux. On other platforms this is a no-op.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    f()
}
