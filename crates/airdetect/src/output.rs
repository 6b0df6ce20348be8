use std::io::IsTerminal;

use airdetect_device::ReadingRecord;
use airdetect_frame::{kind_name, Packet};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

pub fn print_record(record: &ReadingRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let r = &record.reading;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIME", "DEVICE", "PM25", "HCHO", "TEMP", "HUMIDITY"])
                .add_row(vec![
                    local_time(record.timestamp_ms),
                    record.device.to_string(),
                    r.pm25.to_string(),
                    format!("{:.2}", r.hcho),
                    format!("{:.1}", r.temperature),
                    format!("{:.1}", r.humidity),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", pretty_line(record)),
    }
}

/// `<local time>: device <id> => PM25:<n> HCHO:<.2> T:<.1> H:<.1>`
pub fn pretty_line(record: &ReadingRecord) -> String {
    let r = &record.reading;
    format!(
        "{}: device {} => PM25:{} HCHO:{:.2} T:{:.1} H:{:.1}",
        local_time(record.timestamp_ms),
        record.device,
        r.pm25,
        r.hcho,
        r.temperature,
        r.humidity
    )
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    kind: &'a str,
    type_code: u8,
    device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reading: Option<&'a airdetect_frame::Reading>,
}

pub fn print_packet(packet: &Packet, type_code: u8, format: OutputFormat) {
    let reading = match packet {
        Packet::Handshake { .. } => None,
        Packet::Reading { reading, .. } => Some(reading),
    };
    let out = PacketOutput {
        kind: kind_name(type_code),
        type_code,
        device: packet.device().to_string(),
        reading,
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["kind".to_string(), out.kind.to_string()])
                .add_row(vec!["type".to_string(), format!("0x{type_code:02x}")])
                .add_row(vec!["device".to_string(), out.device.clone()]);
            if let Some(r) = reading {
                table
                    .add_row(vec!["pm25".to_string(), r.pm25.to_string()])
                    .add_row(vec!["hcho".to_string(), format!("{:.3}", r.hcho)])
                    .add_row(vec!["temperature".to_string(), format!("{:.1}", r.temperature)])
                    .add_row(vec!["humidity".to_string(), format!("{:.1}", r.humidity)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => match reading {
            Some(r) => println!(
                "{} (0x{type_code:02x}) device {} => PM25:{} HCHO:{:.2} T:{:.1} H:{:.1}",
                out.kind, out.device, r.pm25, r.hcho, r.temperature, r.humidity
            ),
            None => println!("{} (0x{type_code:02x}) device {}", out.kind, out.device),
        },
    }
}

fn local_time(timestamp_ms: u64) -> String {
    let utc = i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default();
    utc.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
