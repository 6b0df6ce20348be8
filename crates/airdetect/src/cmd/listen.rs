use airdetect_device::{DeviceListener, ReadingStream};

use crate::cmd::{runtime, shutdown_signal, ListenArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    runtime()?.block_on(listen(args, format))
}

async fn listen(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.device.connection_config()?;
    let listener = DeviceListener::bind(&args.device.addr)
        .await
        .map_err(|err| device_error("bind failed", err))?
        .with_config(config);

    let output = ReadingStream::new();
    let mut readings = output.subscribe();
    let accept_loop = listener.spawn(output);

    let mut printed = 0usize;
    loop {
        let record = tokio::select! {
            record = readings.recv() => record,
            _ = shutdown_signal() => break,
        };
        let Some(record) = record else { break };

        print_record(&record, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    accept_loop.abort();
    Ok(SUCCESS)
}
