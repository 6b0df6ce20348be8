use std::sync::Arc;

use airdetect::metrics::{render_cache, CONTENT_TYPE};
use airdetect_device::{AggregationCache, DeviceListener, ReadingStream};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::cmd::{runtime, shutdown_signal, ServeArgs};
use crate::exit::{device_error, io_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Clone)]
struct MetricsState {
    cache: Arc<AggregationCache>,
    prefix: Arc<str>,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    runtime()?.block_on(serve(args, format))
}

async fn serve(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.device.connection_config()?;
    let listener = DeviceListener::bind(&args.device.addr)
        .await
        .map_err(|err| device_error("bind failed", err))?
        .with_config(config);
    let metrics_listener = TcpListener::bind(&args.metrics_addr)
        .await
        .map_err(|err| io_error("metrics bind failed", err))?;
    info!(addr = %args.metrics_addr, prefix = %args.prefix, "serving /metrics");

    let output = ReadingStream::new();
    let cache = Arc::new(AggregationCache::new());
    let feeder = {
        let cache = Arc::clone(&cache);
        let subscription = output.subscribe();
        tokio::spawn(async move { cache.feed(subscription).await })
    };
    let printer = (!args.quiet).then(|| {
        let mut readings = output.subscribe();
        tokio::spawn(async move {
            while let Some(record) = readings.recv().await {
                print_record(&record, format);
            }
        })
    });
    let accept_loop = listener.spawn(output);

    let app = router(cache, &args.prefix);
    let served = axum::serve(metrics_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    accept_loop.abort();
    let _ = accept_loop.await;
    if let Some(printer) = printer {
        printer.abort();
    }
    feeder.abort();

    served
        .map(|()| SUCCESS)
        .map_err(|err| CliError::new(FAILURE, format!("metrics server failed: {err}")))
}

fn router(cache: Arc<AggregationCache>, prefix: &str) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(MetricsState {
            cache,
            prefix: Arc::from(prefix),
        })
}

async fn metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        render_cache(&state.prefix, &state.cache),
    )
}
