//! Input device enumeration and selection

use cpal::traits::{DeviceTrait, HostTrait};
use crate::error::AudioError;

/// Wrapper around a cpal input device
pub struct InputDevice {
    inner: cpal::Device,
    pub name: String,
}

impl InputDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self { inner: device, name }
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    /// Get default input config
    pub fn default_input_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_input_config()
            .map_err(|e| AudioError::DeviceNotFound(format!("{}: {}", self.name, e)))
    }
}

/// Summary of an input device for listing
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// List all available input devices
pub fn list_input_devices() -> Vec<InputDeviceInfo> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                let (sample_rates, channels) = get_device_capabilities(&device);
                devices.push(InputDeviceInfo {
                    is_default: default_name.as_ref() == Some(&name),
                    name,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    devices
}

/// Opus-compatible sample rates the device can capture at, and its channel counts
fn get_device_capabilities(device: &cpal::Device) -> (Vec<u32>, Vec<u16>) {
    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();

    if let Ok(configs) = device.supported_input_configs() {
        for config in configs {
            for rate_val in crate::config::OPUS_SAMPLE_RATES {
                let rate = cpal::SampleRate(rate_val);
                if rate >= config.min_sample_rate()
                    && rate <= config.max_sample_rate()
                    && !sample_rates.contains(&rate_val)
                {
                    sample_rates.push(rate_val);
                }
            }

            let ch = config.channels();
            if !channels.contains(&ch) {
                channels.push(ch);
            }
        }
    }

    sample_rates.sort();
    channels.sort();

    (sample_rates, channels)
}

/// Open the input device called `name`, or the host default when `None`
pub fn open_input_device(name: Option<&str>) -> Result<InputDevice, AudioError> {
    let host = cpal::default_host();

    let Some(name) = name else {
        return host
            .default_input_device()
            .map(InputDevice::from_cpal)
            .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string()));
    };

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::CpalError(e.to_string()))?;

    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(InputDevice::from_cpal(device));
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}
