// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fmt};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{error, info, span, warn, Level};

use super::mixer::Mixer;
use super::thread_priority::{
    callback_thread_priority, configure_audio_thread_priority, rt_audio_enabled,
};
use crate::capture::CaptureInput;
use crate::config::audio::Audio;
use crate::engine::EnginePorts;

/// Describes an audio device for listing.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub input_channels: u16,
    pub output_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Inputs={}, Outputs={}) ({})",
            self.name, self.input_channels, self.output_channels, self.host
        )
    }
}

#[allow(deprecated)]
fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "unknown".to_string())
}

/// Lists cpal devices across all available hosts.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let output_channels = device
                .supported_output_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);
            let input_channels = device
                .supported_input_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);
            if output_channels == 0 && input_channels == 0 {
                continue;
            }

            devices.push(DeviceInfo {
                name: device_name(&device),
                host: host_id.name().to_string(),
                input_channels,
                output_channels,
            });
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// A running audio device. The streams stop when this is dropped.
pub struct Device {
    name: String,
    capture_enabled: bool,
    _output: cpal::Stream,
    _input: Option<cpal::Stream>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Device {
    /// Opens the output stream and, when available, the input stream.
    ///
    /// Only a failure of the output side is an error. Without an input device
    /// captures simply end empty.
    pub fn start(config: &Audio, ports: EnginePorts) -> Result<Device, Box<dyn Error>> {
        let span = span!(Level::INFO, "audio device (cpal)");
        let _enter = span.enter();

        let EnginePorts {
            mut mixer,
            capture_input,
        } = ports;

        let host = cpal::default_host();
        let device = match config.output_device() {
            Some(name) => host
                .output_devices()?
                .find(|device| device_name(device).trim() == name)
                .ok_or_else(|| format!("no output device found with name {}", name))?,
            None => host
                .default_output_device()
                .ok_or("no default output device")?,
        };
        let name = device_name(&device);

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let mut stream_config: cpal::StreamConfig = supported.into();
        if let Some(frames) = config.buffer_size() {
            stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
        }
        mixer.set_channels(stream_config.channels);

        info!(
            device = name,
            channels = stream_config.channels,
            sample_rate = ?stream_config.sample_rate,
            engine_rate = config.sample_rate(),
            format = ?sample_format,
            "Opening output stream"
        );
        check_sample_rate(&name, stream_config.sample_rate, config.sample_rate());

        let priority = callback_thread_priority(config.callback_priority());
        let rt_audio = rt_audio_enabled();
        let output = match sample_format {
            cpal::SampleFormat::F32 => {
                build_output_stream::<f32>(&device, &stream_config, mixer, priority, rt_audio)?
            }
            cpal::SampleFormat::I16 => {
                build_output_stream::<i16>(&device, &stream_config, mixer, priority, rt_audio)?
            }
            cpal::SampleFormat::U16 => {
                build_output_stream::<u16>(&device, &stream_config, mixer, priority, rt_audio)?
            }
            other => return Err(format!("unsupported output sample format {:?}", other).into()),
        };
        output.play()?;
        info!(device = name, "Output stream started");

        let input = start_input_stream(&host, config, stream_config.sample_rate, capture_input);
        let capture_enabled = input.is_some();

        Ok(Device {
            name,
            capture_enabled,
            _output: output,
            _input: input,
        })
    }

    /// Returns false when no input stream could be opened.
    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled
    }
}

/// Warns when the device runs at a different rate than the engine's buffers.
/// Returns true when the rates match.
fn check_sample_rate(device: &str, device_rate: cpal::SampleRate, engine_rate: u32) -> bool {
    if device_rate == cpal::SampleRate::from(engine_rate) {
        return true;
    }
    warn!(
        device,
        sample_rate = ?device_rate,
        engine_rate,
        "Output rate differs from the engine rate, buffers play without resampling"
    );
    false
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
    priority: Option<thread_priority::ThreadPriorityValue>,
    rt_audio: bool,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    let mut priority_set = false;
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(priority, rt_audio, &mut priority_set);
            if scratch.len() != data.len() {
                scratch.resize(data.len(), 0.0);
            }
            mixer.render(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

fn start_input_stream(
    host: &cpal::Host,
    config: &Audio,
    sample_rate: cpal::SampleRate,
    capture_input: CaptureInput,
) -> Option<cpal::Stream> {
    let device = match config.input_device() {
        Some(name) => host.input_devices().ok().and_then(|mut devices| {
            devices.find(|device| device_name(device).trim() == name)
        }),
        None => host.default_input_device(),
    };
    let Some(device) = device else {
        warn!("No input device, capture disabled");
        return None;
    };

    let supported = match device.default_input_config() {
        Ok(supported) => supported,
        Err(e) => {
            warn!(error = %e, "No usable input config, capture disabled");
            return None;
        }
    };
    let sample_format = supported.sample_format();
    let mut stream_config: cpal::StreamConfig = supported.into();
    // Captures are played back on the output stream, so record at its rate.
    stream_config.sample_rate = sample_rate;
    let channels = usize::from(stream_config.channels);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                capture_input.append_interleaved(data, channels);
            },
            |err| error!("CPAL input stream error: {}", err),
            None,
        ),
        cpal::SampleFormat::I16 => build_converting_input::<i16>(
            &device,
            &stream_config,
            capture_input,
            channels,
        ),
        cpal::SampleFormat::U16 => build_converting_input::<u16>(
            &device,
            &stream_config,
            capture_input,
            channels,
        ),
        other => {
            warn!(format = ?other, "Unsupported input sample format, capture disabled");
            return None;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Unable to open input stream, capture disabled");
            return None;
        }
    };
    if let Err(e) = stream.play() {
        warn!(error = %e, "Unable to start input stream, capture disabled");
        return None;
    }

    info!(
        device = device_name(&device),
        channels,
        format = ?sample_format,
        "Input stream started"
    );
    Some(stream)
}

fn build_converting_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    capture_input: CaptureInput,
    channels: usize,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut converted: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !capture_input.is_active() {
                return;
            }
            converted.clear();
            converted.extend(data.iter().map(|&s| f32::from_sample(s)));
            capture_input.append_interleaved(&converted, channels);
        },
        |err| error!("CPAL input stream error: {}", err),
        None,
    )
}
