//! Temperature readings served by the HTTP endpoint

use serde::Serialize;

/// Source of raw on-die temperature samples.
///
/// Reads are assumed infallible; a sensor that cannot produce a value should
/// return its last known sample.
pub trait TemperatureSource {
    /// Current temperature in milli-degrees Celsius.
    fn read_millicelsius(&mut self) -> i32;
}

impl<T: TemperatureSource + ?Sized> TemperatureSource for &mut T {
    fn read_millicelsius(&mut self) -> i32 {
        (**self).read_millicelsius()
    }
}

/// One temperature sample in both scales, as sent on the wire.
///
/// The field names are part of the published JSON contract and are kept
/// byte-for-byte, including the trailing colon on the Celsius key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    #[serde(rename = "tempC:")]
    pub celsius: f64,
    #[serde(rename = "temF")]
    pub fahrenheit: f64,
}

impl TemperatureReading {
    pub fn from_millicelsius(raw: i32) -> Self {
        let celsius = f64::from(raw) / 1000.0;
        Self {
            celsius,
            fahrenheit: celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Take a fresh sample from `source`.
    pub fn sample<S: TemperatureSource>(source: &mut S) -> Self {
        Self::from_millicelsius(source.read_millicelsius())
    }
}
