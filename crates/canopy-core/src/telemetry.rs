//! Telemetry frame uploaded each reporting cycle.

use core::fmt::Write as _;

/// Bound on one rendered JSON body.
pub const REPORT_CAPACITY: usize = 256;

/// One cycle's smoothed readings, ready for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvReport {
    pub temperature: f64,
    pub humidity: f64,
    pub light: u16,
}

impl EnvReport {
    /// Renders the upload body. Temperature and humidity carry one decimal
    /// place; light is the integer display scale.
    pub fn to_json(&self) -> Result<heapless::String<REPORT_CAPACITY>, core::fmt::Error> {
        let mut body = heapless::String::new();
        write!(
            body,
            "{{\"temperature\": {:.1}, \"humidity\": {:.1}, \"light\": {}}}",
            self.temperature, self.humidity, self.light
        )?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_wire_format() {
        let report = EnvReport {
            temperature: 23.42,
            humidity: 51.0,
            light: 640,
        };
        assert_eq!(
            report.to_json().unwrap().as_str(),
            "{\"temperature\": 23.4, \"humidity\": 51.0, \"light\": 640}"
        );
    }

    #[test]
    fn negative_temperatures_render_signed() {
        let report = EnvReport {
            temperature: -3.25,
            humidity: 40.0,
            light: 10,
        };
        let json = report.to_json().unwrap();
        assert!(json.as_str().starts_with("{\"temperature\": -3.2"));
    }
}
