//! Default-microphone pitch source using cpal.

use super::{AnalyzerSettings, CaptureError, FrameSink, PitchAnalyzer, PitchSource};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

/// Captures from the system's default input device.
pub struct MicrophoneSource {
    settings: AnalyzerSettings,
    /// Live input stream; dropping it releases the device.
    stream: Option<cpal::Stream>,
}

impl MicrophoneSource {
    pub fn new(settings: AnalyzerSettings) -> Self {
        Self {
            settings,
            stream: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut analyzer: PitchAnalyzer,
        sink: FrameSink,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample + Send + 'static,
        f32: FromSample<T>,
    {
        let channels = config.channels as usize;
        let mut buffer: Vec<f32> = Vec::new();
        device.build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                buffer.clear();
                buffer.extend(data.iter().map(|s| s.to_sample::<f32>()));
                analyzer.push_interleaved(&buffer, channels, |pitch_hz| {
                    tracing::trace!(pitch_hz, "analysis frame");
                    sink.send(pitch_hz);
                });
            },
            |err| tracing::error!("Input stream error: {}", err),
            None,
        )
    }
}

impl PitchSource for MicrophoneSource {
    fn open(&mut self, window: usize, sink: FrameSink) -> Result<(), CaptureError> {
        self.close();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()))?;
        let supported = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable(e.to_string())
            }
            other => CaptureError::PermissionDenied(other.to_string()),
        })?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let analyzer = PitchAnalyzer::new(window, config.sample_rate.0, self.settings);

        tracing::info!(
            device = device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            window,
            "Opening microphone"
        );

        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, analyzer, sink),
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, analyzer, sink),
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, analyzer, sink),
            other => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable(e.to_string())
            }
            other => CaptureError::PermissionDenied(other.to_string()),
        })?;

        stream
            .play()
            .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::warn!("Failed to pause input stream: {}", e);
            }
            tracing::info!("Microphone released");
        }
    }

    fn describe(&self) -> String {
        "microphone".to_string()
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.close();
    }
}
