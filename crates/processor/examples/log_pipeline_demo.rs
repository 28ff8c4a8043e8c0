//! End-to-end example of an events stream
//!
//! This example demonstrates:
//! - Filtering warnings and routing them to a target
//! - Counting messages per interval
//! - Rolling latency percentiles
//! - Smoothed message rates
//!
//! Run with: cargo run --package processor --example log_pipeline_demo

use logflow_types::{Level, Message, Units};
use processor::{
    init_tracing, Events, FireAndForget, LoggingConfig, PipelineConfig, TargetRegistry,
    TracingTarget,
};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&LoggingConfig {
        filter: "info,processor=debug".to_string(),
        json: false,
    })?;

    let config = PipelineConfig {
        rate_interval_ms: 500,
        percentile_interval_ms: 1_000,
        ..Default::default()
    };
    config.validate()?;

    let targets = TargetRegistry::new().with_target(TracingTarget::new("console"));

    let processing = FireAndForget::stream()
        .subscriber(Events::events().min_level(Level::Warn).sink(["console"]))
        .subscriber(Events::events().counter("demo.messages", config.flush_interval()))
        .subscriber(
            Events::events()
                .service("checkout")
                .percentiles("demo.latency_ms", config.percentile_interval()),
        )
        .subscriber(Events::events().rate(
            "demo.rate",
            config.rate_interval(),
            config.alpha_period(),
        ))
        .to_processing_with(targets.fire_and_forget_sink(), &config);

    info!("feeding synthetic messages");
    for i in 0..60u32 {
        let latency = Message::gauge("request_ms", f64::from(20 + (i * 7) % 90), Units::Milliseconds)
            .with_service("checkout");
        processing.submit(latency).await?;

        if i % 15 == 0 {
            let warning = Message::event(Level::Warn, "slow upstream response")
                .with_name("checkout.client")
                .with_context("attempt", i);
            processing.submit(warning).await?;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    processing.shutdown();
    info!("demo finished");
    Ok(())
}
