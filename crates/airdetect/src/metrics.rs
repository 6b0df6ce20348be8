//! Prometheus text exposition of the latest reading per device.

use std::fmt::{self, Write};

use airdetect_device::{AggregationCache, ReadingRecord};
use airdetect_frame::DeviceId;

/// Metric name prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "airdetector";

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

const GAUGES: [(&str, &str); 4] = [
    ("humidity", "humidity in %H"),
    ("temperature", "temperature in degC"),
    ("pm25", "pm25 in ug/m3"),
    ("hcho", "hcho in mg/m3"),
];

/// Render a cache snapshot, devices sorted by identity.
pub fn render_cache(prefix: &str, cache: &AggregationCache) -> String {
    let mut entries = cache.snapshot();
    entries.sort_by_key(|(device, _)| *device);
    render(prefix, &entries)
}

/// Render entries in the order given.
///
/// `prefix` is joined to metric names with `_`; an empty prefix yields bare
/// names. Every sample carries the record's receive time.
pub fn render(prefix: &str, entries: &[(DeviceId, ReadingRecord)]) -> String {
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}_")
    };

    let mut out = String::new();
    for (name, help) in GAUGES {
        let _ = writeln!(out, "# HELP {prefix}{name} {help}");
        let _ = writeln!(out, "# TYPE {prefix}{name} gauge");
    }

    for (device, record) in entries {
        let ts = record.timestamp_ms;
        let r = &record.reading;
        let (humidity, temperature, hcho) =
            (Sample(r.humidity), Sample(r.temperature), Sample(r.hcho));
        let _ = writeln!(out, "{prefix}humidity{{device=\"{device}\"}} {humidity} {ts}");
        let _ = writeln!(out, "{prefix}temperature{{device=\"{device}\"}} {temperature} {ts}");
        let _ = writeln!(out, "{prefix}pm25{{device=\"{device}\"}} {} {ts}", r.pm25);
        let _ = writeln!(out, "{prefix}hcho{{device=\"{device}\"}} {hcho} {ts}");
    }

    out
}

/// Sample value in exposition spelling: `NaN`, `+Inf` and `-Inf` for the
/// non-finite cases.
struct Sample(f64);

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            f.write_str("NaN")
        } else if v.is_infinite() {
            f.write_str(if v > 0.0 { "+Inf" } else { "-Inf" })
        } else {
            write!(f, "{v}")
        }
    }
}
