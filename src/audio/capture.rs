//! CPAL-backed capture of microphone or system loopback audio.

use crate::audio::recorder::AudioSource;
use crate::audio::wav::resample;
use crate::error::{MeetmindError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Redirects fd 2 to /dev/null for the lifetime of the guard.
///
/// Probing audio backends makes ALSA/JACK print warnings straight to
/// stderr. None of it is actionable, so device enumeration and stream
/// setup run behind this gate.
///
/// # Safety
/// Swaps fd 2 with `libc::dup2`. Not safe if another thread is
/// rewiring stderr at the same time.
struct StderrGate {
    saved_fd: i32,
}

impl StderrGate {
    fn engage() -> Self {
        let saved_fd = unsafe {
            let saved = libc::dup(2);
            let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
            if saved >= 0 && devnull >= 0 {
                libc::dup2(devnull, 2);
                libc::close(devnull);
            }
            saved
        };
        Self { saved_fd }
    }
}

impl Drop for StderrGate {
    fn drop(&mut self) {
        if self.saved_fd >= 0 {
            unsafe {
                libc::dup2(self.saved_fd, 2);
                libc::close(self.saved_fd);
            }
        }
    }
}

/// Sound-server backends that handle format negotiation for us.
const PREFERRED_BACKENDS: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Names that identify a virtual loopback carrying system audio, which
/// is where the other meeting participants' voices live.
const LOOPBACK_MARKERS: &[&str] = &[
    "CABLE",
    "VB-Audio",
    "Virtual Cable",
    "Voicemod",
    "Virtual Audio",
    "monitor",
];

/// Raw ALSA endpoints that are never useful as a voice input.
const NOISE_MARKERS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

fn contains_marker(name: &str, markers: &[&str]) -> bool {
    let lower = name.to_lowercase();
    markers.iter().any(|m| lower.contains(&m.to_lowercase()))
}

/// True for devices that should be hidden from the device listing.
fn is_unusable(name: &str) -> bool {
    contains_marker(name, NOISE_MARKERS)
}

fn is_preferred_backend(name: &str) -> bool {
    contains_marker(name, PREFERRED_BACKENDS)
}

/// True for virtual loopback devices that expose system playback as an
/// input.
pub fn is_virtual_loopback(name: &str) -> bool {
    contains_marker(name, LOOPBACK_MARKERS)
}

/// Enumerate usable capture devices, annotated for the `devices`
/// subcommand.
///
/// Loopback devices get a "[system audio]" tag since they are the right
/// choice for hearing a call, and sound-server backends get
/// "[recommended]". Surround/HDMI endpoints are dropped.
pub fn list_devices() -> Result<Vec<String>> {
    let _gate = StderrGate::engage();
    let host = cpal::default_host();
    let devices = host.input_devices().map_err(|e| MeetmindError::AudioCapture {
        message: format!("cannot enumerate capture devices: {e}"),
    })?;

    let mut names = Vec::new();
    for name in devices.filter_map(|d| d.name().ok()) {
        if is_unusable(&name) {
            continue;
        }
        if is_virtual_loopback(&name) {
            names.push(format!("{name} [system audio]"));
        } else if is_preferred_backend(&name) {
            names.push(format!("{name} [recommended]"));
        } else {
            names.push(name);
        }
    }
    Ok(names)
}

/// Default device selection: a sound-server backend if one exposes an
/// input, otherwise whatever the host calls the default.
fn pick_default_device(host: &cpal::Host) -> Result<cpal::Device> {
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name()
                && is_preferred_backend(&name)
            {
                return Ok(device);
            }
        }
    }
    host.default_input_device()
        .ok_or_else(|| MeetmindError::AudioDeviceNotFound {
            device: "default".to_string(),
        })
}

/// cpal streams are !Send. The pipeline owns the stream behind a Mutex
/// and never touches it from two threads at once, so the marker is
/// sound here.
struct CaptureStream(cpal::Stream);

unsafe impl Send for CaptureStream {}

/// Capture device producing mono f32 at the pipeline rate.
///
/// Asks the device for f32/mono at the target rate first; sound servers
/// resample transparently. If the device refuses, falls back to its
/// native config and converts in the callback.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<CaptureStream>>>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Opens the named device, or picks a default when `device_name` is
    /// `None`. Captured audio is delivered at `sample_rate`.
    pub fn new(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let _gate = StderrGate::engage();
        let host = cpal::default_host();

        let device = match device_name {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| MeetmindError::AudioCapture {
                    message: format!("cannot enumerate capture devices: {e}"),
                })?
                .find(|d| d.name().is_ok_and(|n| n == wanted))
                .ok_or_else(|| MeetmindError::AudioDeviceNotFound {
                    device: wanted.to_string(),
                })?,
            None => pick_default_device(&host)?,
        };

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate,
        })
    }

    fn open_stream(&self) -> Result<cpal::Stream> {
        let wanted = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let sink = Arc::clone(&self.buffer);
        let attempt = self.device.build_input_stream(
            &wanted,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = sink.lock() {
                    buf.extend_from_slice(data);
                }
            },
            report_stream_error,
            None,
        );
        match attempt {
            Ok(stream) => Ok(stream),
            Err(_) => self.open_native_stream(),
        }
    }

    /// Fallback path: run the device at its native config and downmix
    /// plus resample inside the callback.
    fn open_native_stream(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let native = self
            .device
            .default_input_config()
            .map_err(|e| MeetmindError::AudioCapture {
                message: format!("no usable input config: {e}"),
            })?;

        let channels = native.channels() as usize;
        let from_rate = native.sample_rate().0;
        let to_rate = self.sample_rate;
        let config: cpal::StreamConfig = native.clone().into();

        eprintln!(
            "meetmind: device runs at {channels}ch/{from_rate}Hz/{:?}, converting in software",
            native.sample_format(),
        );

        let sink = Arc::clone(&self.buffer);
        let stream = match native.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = to_mono(data, channels, from_rate, to_rate);
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(&mono);
                    }
                },
                report_stream_error,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| f32::from(s) / f32::from(i16::MAX)).collect();
                    let mono = to_mono(&floats, channels, from_rate, to_rate);
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(&mono);
                    }
                },
                report_stream_error,
                None,
            ),
            other => {
                return Err(MeetmindError::AudioCapture {
                    message: format!(
                        "sample format {other:?} is not supported, pick another device with --device"
                    ),
                })
            }
        };

        stream.map_err(|e| MeetmindError::AudioCapture {
            message: format!("cannot open native capture stream: {e}"),
        })
    }
}

fn report_stream_error(err: cpal::StreamError) {
    eprintln!("meetmind: capture stream error: {err}");
}

/// Average interleaved channels down to one and resample if the rates
/// differ.
fn to_mono(samples: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f32> {
    let mono: Vec<f32> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    if from_rate == to_rate {
        mono
    } else {
        resample(&mono, from_rate, to_rate)
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut slot = self.stream.lock().map_err(|e| MeetmindError::AudioCapture {
            message: format!("stream lock poisoned: {e}"),
        })?;
        if slot.is_some() {
            return Ok(());
        }

        let _gate = StderrGate::engage();
        let stream = self.open_stream()?;
        stream.play().map_err(|e| MeetmindError::AudioCapture {
            message: format!("cannot start capture: {e}"),
        })?;
        *slot = Some(CaptureStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut slot = self.stream.lock().map_err(|e| MeetmindError::AudioCapture {
            message: format!("stream lock poisoned: {e}"),
        })?;
        // Dropping the stream releases the device handle
        *slot = None;

        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        let mut buf = self.buffer.lock().map_err(|e| MeetmindError::AudioCapture {
            message: format!("buffer lock poisoned: {e}"),
        })?;
        Ok(std::mem::take(&mut *buf))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
