//! # Ledger Server
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize tracing (and span export when a collector is configured)
//! - Initialize the repository adapter and the bootstrap key
//! - Start the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_hex::{PaymentService, bootstrap::ensure_privileged_key, inbound::HttpServer};
use ledger_repo::build_repo;

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("ledger-server"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;

    let otel = config
        .otlp_endpoint
        .as_deref()
        .map(init_tracer)
        .transpose()?;
    let (telemetry, otel_provider) = match otel {
        Some((tracer, provider)) => (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(provider),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ledger_server=debug,ledger_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!(addr = %config.bind_addr(), "Starting ledger server");
    tracing::info!(otlp = config.otlp_endpoint.is_some(), "Span export configured");

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    if let Some(raw_key) = ensure_privileged_key(&repo, &config.bootstrap_key_name).await {
        tracing::warn!(
            key_name = %config.bootstrap_key_name,
            api_key = %raw_key,
            "Issued back office API key; it is shown only once"
        );
    }

    let server = HttpServer::new(PaymentService::new(repo));
    server.run(&config.bind_addr()).await?;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
