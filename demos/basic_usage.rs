//! Basic usage example for the etcd keys client
//!
//! Run with: cargo run --example basic_usage
//! The endpoint is taken from ETCD_ENDPOINT (default http://127.0.0.1:2379).

use std::ops::ControlFlow;

use etcd_keys_client::{Client, CreateOptions, DeleteOptions, GetOptions, SetOptions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = Client::from_env()?;

    info!("Checking store health...");
    if !client.health_check().await? {
        warn!("Store at {} is not healthy", client.endpoint());
        return Ok(());
    }
    let version = client.version().await?;
    info!("Connected to etcd {}", version.etcdserver);

    // Plain write and read
    let written = client
        .set("/demo/greeting", "hello", SetOptions::with_ttl(60))
        .await?;
    info!("Stored at index {}", written.node.modified_index);

    let read = client.get("/demo/greeting", GetOptions::default()).await?;
    info!("Retrieved: {:?}", read.value());

    // A lock that only one process can take
    match client
        .create("/demo/lock", CreateOptions::value("basic_usage"))
        .await
    {
        Ok(_) => info!("Lock acquired"),
        Err(e) if e.is_precondition_failed() => info!("Lock already held"),
        Err(e) => return Err(e.into()),
    }

    // Swap only if nobody changed the value in between
    client
        .compare_and_swap("/demo/greeting", "hello again", "hello", None)
        .await?;

    // Queue three jobs and list them in order
    for job in ["build", "test", "deploy"] {
        client.create_in_order("/demo/jobs", job, None).await?;
    }
    let jobs = client
        .get(
            "/demo/jobs",
            GetOptions {
                sorted: Some(true),
                ..Default::default()
            },
        )
        .await?;
    for node in jobs.node.children() {
        info!("Job {:?} = {:?}", node.key, node.value);
    }

    // Replay every change to /demo/greeting from the first write onwards
    let mut seen = 0;
    client
        .eternal_watch_with(
            "/demo/greeting",
            Some(written.node.modified_index),
            |change| {
                seen += 1;
                info!("Change {:?}: {:?}", change.action, change.value());
                if seen == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .await?;

    // Clean up
    client
        .delete(
            "/demo",
            DeleteOptions {
                recursive: Some(true),
                ..Default::default()
            },
        )
        .await?;
    info!("Removed /demo");

    Ok(())
}
