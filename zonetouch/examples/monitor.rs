//! Print every state change pushed by a controller

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use zonetouch::{Client, ClientConfig, DeviceState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = std::env::var("ZONETOUCH_HOST").unwrap_or_else(|_| "192.168.1.50".to_string());
    let port = match std::env::var("ZONETOUCH_PORT") {
        Ok(port) => port.parse().context("ZONETOUCH_PORT must be a port number")?,
        Err(_) => zonetouch_core::DEFAULT_PORT,
    };

    let client = Client::with_handler(
        ClientConfig::new(host).with_port(port),
        |state: &DeviceState| {
            println!("{}", state);
            for zone in state.zones() {
                println!("  {}", zone);
            }
        },
    );

    client.connect().await.context("connecting to controller")?;
    client.start_listener().await?;

    let state = client.fetch_full_state().await.context("fetching full state")?;
    println!(
        "{} (firmware {}), {} zones",
        state.device_id,
        state.firmware_version,
        state.zones.len()
    );

    println!("Watching for updates, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    client.close().await?;
    Ok(())
}
