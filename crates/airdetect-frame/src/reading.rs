use serde::{Deserialize, Serialize};

use crate::error::{FieldError, PayloadError};

/// Devices report HCHO in µg/m³; readings expose mg/m³.
pub const HCHO_SCALE: f64 = 1000.0;

/// One environmental measurement from a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Formaldehyde concentration in mg/m³.
    pub hcho: f64,
    /// PM2.5 concentration in µg/m³.
    pub pm25: i64,
}

/// Payload as sent on the wire: every number is string-encoded.
#[derive(Debug, Deserialize)]
struct RawReading {
    humidity: String,
    temperature: String,
    hcho: String,
    #[serde(alias = "pm25")]
    value: String,
}

impl Reading {
    /// Parse a reading payload.
    ///
    /// Every field is converted even after a failure so that the error lists
    /// all bad fields, in payload order.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        let raw: RawReading = serde_json::from_slice(payload)?;
        let mut errors = Vec::new();

        let humidity = parse_field::<f64>("humidity", &raw.humidity, &mut errors);
        let temperature = parse_field::<f64>("temperature", &raw.temperature, &mut errors);
        let hcho = parse_field::<f64>("hcho", &raw.hcho, &mut errors);
        let pm25 = parse_field::<i64>("value", &raw.value, &mut errors);

        match (humidity, temperature, hcho, pm25) {
            (Some(humidity), Some(temperature), Some(hcho), Some(pm25)) if errors.is_empty() => {
                Ok(Self {
                    humidity,
                    temperature,
                    hcho: hcho / HCHO_SCALE,
                    pm25,
                })
            }
            _ => Err(PayloadError::InvalidFields(errors)),
        }
    }
}

fn parse_field<T>(field: &'static str, value: &str, errors: &mut Vec<FieldError>) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            errors.push(FieldError {
                field,
                value: value.to_string(),
                reason: err.to_string(),
            });
            None
        }
    }
}
