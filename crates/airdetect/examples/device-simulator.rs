//! Fake sensor: handshakes, then sends one reading per second.
//!
//! Run with:
//!   cargo run --features cli -- listen --addr 127.0.0.1:9000
//!
//! In another terminal:
//!   cargo run --example device-simulator -- 127.0.0.1:9000 de:ad:be:ef:00:01

use std::time::Duration;

use airdetect::frame::{encode_frame, encode_handshake, DeviceId, READING_FIRST};
use airdetect::transport::TcpTransport;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:9000".to_string());
    let device: DeviceId = args
        .next()
        .unwrap_or_else(|| "de:ad:be:ef:00:01".to_string())
        .parse()?;

    let mut stream = TcpTransport::connect(addr.parse()?).await?;
    eprintln!("Connected to {addr} as {device}");

    let mut buf = BytesMut::new();
    encode_handshake(device, &mut buf);
    stream.write_all(&buf).await?;

    let mut tick: u32 = 0;
    loop {
        let payload = format!(
            r#"{{"humidity":"{:.1}","temperature":"{:.1}","hcho":"{}","value":"{}"}}"#,
            45.0 + f64::from(tick % 10),
            21.0 + f64::from(tick % 5) / 2.0,
            20 + tick % 30,
            8 + tick % 12,
        );
        buf.clear();
        encode_frame(device, READING_FIRST, payload.as_bytes(), &mut buf);
        stream.write_all(&buf).await?;
        eprintln!("Sent reading {tick}: {payload}");
        tick = tick.wrapping_add(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
