//! Set one zone's damper position
//!
//! ```text
//! ZONETOUCH_HOST=192.168.1.50 cargo run --example set_zone -- 2 60
//! ```

use std::time::Duration;

use anyhow::{bail, Context};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use zonetouch::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(zone), Some(position)) = (args.next(), args.next()) else {
        bail!("usage: set_zone <zone id> <position 0-100>");
    };
    let zone: u8 = zone.parse().context("zone id must be a number")?;
    let position: u8 = position.parse().context("position must be a number")?;

    let host = std::env::var("ZONETOUCH_HOST").unwrap_or_else(|_| "192.168.1.50".to_string());
    let port = match std::env::var("ZONETOUCH_PORT") {
        Ok(port) => port.parse().context("ZONETOUCH_PORT must be a port number")?,
        Err(_) => zonetouch_core::DEFAULT_PORT,
    };

    let client = Client::new(ClientConfig::new(host).with_port(port));
    client.connect().await?;
    client.start_listener().await?;

    let before = client.fetch_full_state().await?;
    let Some(current) = before.zone(zone) else {
        bail!("controller has no zone {}", zone);
    };
    println!("{} -> {}%", current, position);

    client.set_position(zone, position).await?;

    // give the controller a moment to push the new status
    sleep(Duration::from_secs(2)).await;
    if let Some(updated) = client.state().zone(zone) {
        println!("{}", updated);
    }

    client.close().await?;
    Ok(())
}
