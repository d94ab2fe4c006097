//! Monitor BGAPI events while scanning.
//!
//! Starts a generic discovery and prints every event the module sends for
//! thirty seconds: scan responses, connection status changes and
//! disconnects.
//!
//! # Requirements
//!
//! - A BLED112 (or compatible) dongle
//! - Serial port path adjusted for your system
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=bgapi_ble=debug cargo run -p bgapi --example monitor_events
//! ```

use std::time::Duration;

use bgapi::enums::{GapConnectableMode, GapDiscoverMode, GapDiscoverableMode};
use bgapi::{BgapiBuilder, Error, Response, commands};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let serial_port = "/dev/ttyACM0";
    println!("Connecting to BGAPI module on {}...", serial_port);

    let handler = BgapiBuilder::new().serial_port(serial_port).build().await?;
    handler.add_handler_listener(|cause: &Error| {
        eprintln!("handler terminated: {}", cause);
    });

    let info = handler.get_info().await?;
    println!("Firmware {} (hw {})\n", info.version(), info.hw);

    let mut events = handler.subscribe();

    handler
        .transaction(&commands::gap_set_mode(
            GapDiscoverableMode::NonDiscoverable,
            GapConnectableMode::NonConnectable,
        ))
        .await?;
    handler
        .transaction(&commands::gap_discover(GapDiscoverMode::Generic))
        .await?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    let start = tokio::time::Instant::now();

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(event)) => {
                let elapsed = start.elapsed();
                let timestamp = format!("{:>6}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis());

                match &*event {
                    Response::GapScanResponse(scan) => {
                        let name = scan.eir().name().unwrap_or_default();
                        println!(
                            "{} ScanResponse      {} {:>4} dBm {}",
                            timestamp, scan.sender, scan.rssi, name
                        );
                    }
                    Response::ConnectionStatus(status) => {
                        println!(
                            "{} ConnectionStatus  #{} {} {}",
                            timestamp, status.connection, status.address, status.flags
                        );
                    }
                    Response::ConnectionDisconnected(disc) => {
                        println!(
                            "{} Disconnected      #{} {}",
                            timestamp, disc.connection, disc.reason
                        );
                    }
                    other => println!("{} {}", timestamp, other.name()),
                }
            }
            Ok(Err(RecvError::Lagged(n))) => {
                println!("(missed {} events due to lag)", n);
            }
            Ok(Err(RecvError::Closed)) => {
                println!("Event channel closed.");
                break;
            }
            Err(_) => break,
        }
    }

    handler.transaction(&commands::gap_end_procedure()).await?;
    handler.shutdown().await?;
    println!("\nMonitoring complete.");
    Ok(())
}
