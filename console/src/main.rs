// bgapi console -- CLI tool for exercising a BGAPI module over a serial port.
//
// Usage:
//   bgapi-console --port /dev/ttyACM0 hello
//   bgapi-console --port /dev/ttyACM0 info
//   bgapi-console --port /dev/ttyACM0 counters
//   bgapi-console --port /dev/ttyACM0 connections
//   bgapi-console --port /dev/ttyACM0 discover --duration 10
//   bgapi-console --port COM3 --baud 57600 --no-flow-control -vv discover --passive

mod devices;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use bgapi::enums::{GapConnectableMode, GapDiscoverMode, GapDiscoverableMode};
use bgapi::{BgapiBuilder, BgapiHandler, Command, Error, Response, available_ports, commands};

use devices::DeviceRegistry;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// bgapi console -- talks to a BGAPI module from the command line.
#[derive(Parser)]
#[command(name = "bgapi-console", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyACM0, COM3).
    #[arg(long)]
    port: String,

    /// Baud rate. Ignored by USB CDC dongles.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Disable RTS/CTS flow control.
    #[arg(long)]
    no_flow_control: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand)]
enum ConsoleCommand {
    /// Check that the module answers.
    Hello,

    /// Print firmware version and device address.
    Info,

    /// Read and reset the packet counters.
    Counters,

    /// Print the number of connections the module supports.
    Connections,

    /// Scan for advertising devices.
    Discover {
        /// How long to scan, in seconds.
        #[arg(long, default_value_t = 10)]
        duration: u64,

        /// Listen only; do not send scan requests.
        #[arg(long)]
        passive: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "bgapi_ble=debug,bgapi_transport=debug,info",
        _ => "bgapi_ble=trace,bgapi_transport=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn print_port_candidates() {
    match available_ports() {
        Ok(ports) if !ports.is_empty() => {
            eprintln!("Serial ports found:");
            for port in ports {
                let hint = if port.is_bled112 { "  (BLED112)" } else { "" };
                eprintln!("  {}{}", port.name, hint);
            }
        }
        Ok(_) => eprintln!("No serial ports found."),
        Err(e) => tracing::debug!(error = %e, "port enumeration failed"),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_hello(handler: &BgapiHandler) -> Result<()> {
    let start = tokio::time::Instant::now();
    handler.hello().await?;
    println!("Module answered in {:?}", start.elapsed());
    Ok(())
}

async fn cmd_info(handler: &BgapiHandler) -> Result<()> {
    let info = handler.get_info().await?;
    let address = handler.address().await?;

    println!("Module Information");
    println!("  Firmware:       {}", info.version());
    println!("  Link layer:     {}", info.ll_version);
    println!("  Protocol:       {}", info.protocol_version);
    println!("  Hardware:       {}", info.hw);
    println!("  Address:        {}", address);
    Ok(())
}

async fn cmd_counters(handler: &BgapiHandler) -> Result<()> {
    let counters = handler.get_counters().await?;

    println!("Packet Counters");
    println!("  TX ok:          {}", counters.txok);
    println!("  TX retry:       {}", counters.txretry);
    println!("  RX ok:          {}", counters.rxok);
    println!("  RX fail:        {}", counters.rxfail);
    println!("  Free buffers:   {}", counters.mbuf);
    Ok(())
}

async fn cmd_connections(handler: &BgapiHandler) -> Result<()> {
    let connections = handler.get_connections().await?;
    println!("Max connections: {}", connections.maxconn);
    Ok(())
}

/// Send a command whose response carries only a result code, and fail
/// unless the module reports success.
async fn expect_success(handler: &BgapiHandler, command: &Command) -> Result<()> {
    let response = handler.transaction(command).await?;
    match response.result() {
        Some(result) if result.is_success() => Ok(()),
        Some(result) => bail!("{} failed: {}", response.name(), result),
        None => bail!("unexpected response {}", response.name()),
    }
}

async fn cmd_discover(handler: &BgapiHandler, duration: Duration, passive: bool) -> Result<()> {
    let mut events = handler.subscribe();

    expect_success(
        handler,
        &commands::gap_set_mode(
            GapDiscoverableMode::GeneralDiscoverable,
            GapConnectableMode::DirectedConnectable,
        ),
    )
    .await
    .context("set_mode")?;
    expect_success(
        handler,
        &commands::gap_set_scan_parameters(0x40, 0x30, !passive),
    )
    .await
    .context("set_scan_parameters")?;
    expect_success(handler, &commands::gap_discover(GapDiscoverMode::Generic))
        .await
        .context("discover")?;

    println!(
        "Scanning for {}s ({})...\n",
        duration.as_secs(),
        if passive { "passive" } else { "active" }
    );

    let mut registry = DeviceRegistry::new();
    let deadline = tokio::time::Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(event)) => {
                if let Response::GapScanResponse(scan) = &*event {
                    if registry.update(scan) {
                        println!(
                            "  new device {} {:>4} dBm {}",
                            scan.sender,
                            scan.rssi,
                            scan.eir().name().unwrap_or_default()
                        );
                    }
                }
            }
            Ok(Err(RecvError::Lagged(n))) => {
                tracing::warn!(missed = n, "event stream lagged");
            }
            Ok(Err(RecvError::Closed)) => bail!("handler closed during discovery"),
            Err(_) => break,
        }
    }

    expect_success(handler, &commands::gap_end_procedure())
        .await
        .context("end_procedure")?;

    println!();
    println!("{} device(s) found", registry.len());
    println!(
        "  {:<17}  {:<7}  {:>4}  {:>5}  Name",
        "Address", "Type", "RSSI", "Seen"
    );
    for device in registry.by_rssi() {
        println!(
            "  {:<17}  {:<7}  {:>4}  {:>5}  {}",
            device.address.to_string(),
            format!("{:?}", device.address_type),
            device.rssi,
            device.seen,
            device.name().unwrap_or_default()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let handler = match BgapiBuilder::new()
        .serial_port(&cli.port)
        .baud_rate(cli.baud)
        .flow_control(!cli.no_flow_control)
        .build()
        .await
    {
        Ok(handler) => handler,
        Err(e) => {
            print_port_candidates();
            return Err(e).with_context(|| format!("failed to open {}", cli.port));
        }
    };
    handler.add_handler_listener(|cause: &Error| {
        eprintln!("Connection to module lost: {}", cause);
    });

    let result = match cli.command {
        ConsoleCommand::Hello => cmd_hello(&handler).await,
        ConsoleCommand::Info => cmd_info(&handler).await,
        ConsoleCommand::Counters => cmd_counters(&handler).await,
        ConsoleCommand::Connections => cmd_connections(&handler).await,
        ConsoleCommand::Discover { duration, passive } => {
            cmd_discover(&handler, Duration::from_secs(duration), passive).await
        }
    };

    handler.shutdown().await.ok();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_discover_options() {
        let cli = Cli::try_parse_from([
            "bgapi-console",
            "--port",
            "/dev/ttyACM0",
            "--no-flow-control",
            "-vv",
            "discover",
            "--duration",
            "5",
            "--passive",
        ])
        .unwrap();
        assert_eq!(cli.port, "/dev/ttyACM0");
        assert_eq!(cli.baud, 115_200);
        assert!(cli.no_flow_control);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            ConsoleCommand::Discover {
                duration: 5,
                passive: true
            }
        ));
    }

    #[test]
    fn port_is_required() {
        assert!(Cli::try_parse_from(["bgapi-console", "hello"]).is_err());
    }
}
