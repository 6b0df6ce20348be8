use airdetect_frame::Frame;

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let frame = Frame::parse(bytes).map_err(|err| decode_error("decode failed", err.into()))?;
    let packet = frame
        .decode()
        .map_err(|err| decode_error("decode failed", err))?;
    print_packet(&packet, frame.type_code(), format);
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
    hex::decode(cleaned).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")))
}
