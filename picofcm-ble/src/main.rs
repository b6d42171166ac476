//! BLE provisioning tool for PicoFCM devices
//!
//! Scans for PicoFCM devices, stores WiFi credentials and the notification
//! endpoint on them, and sends provisioning commands.

use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use picofcm_ble_controller::ControllerError;
use picofcm_ble_controller::ble::{self, Endpoint};
use picofcm_proto::PairingStatus;

#[derive(Parser)]
#[command(name = "picofcm-ble")]
#[command(about = "BLE provisioning tool for PicoFCM devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for PicoFCM devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Store a WiFi network (and optionally the notification endpoint) on a device
    Save {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        network: Network,
        /// Notification endpoint URL
        #[arg(long, requires = "fcm_token")]
        fcm_url: Option<String>,
        /// Notification recipient token
        #[arg(long, requires = "fcm_url")]
        fcm_token: Option<String>,
    },
    /// Make a device join a network
    Connect {
        #[command(flatten)]
        target: Target,
        /// Use the first network stored on the device
        #[arg(long, conflicts_with_all = ["ssid", "password"])]
        stored: bool,
        #[command(flatten)]
        network: Network,
    },
    /// Erase all stored networks and the notification endpoint
    Clear {
        #[command(flatten)]
        target: Target,
    },
    /// Disconnect a device from WiFi
    Disconnect {
        #[command(flatten)]
        target: Target,
    },
    /// Read the pairing status of a device
    PairingStatus {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
struct Target {
    /// Device name or address to connect to
    #[arg(short, long, env = "PICOFCM_DEVICE")]
    device: Option<String>,
}

#[derive(Args)]
struct Network {
    /// WiFi network name (overrides the credentials file)
    #[arg(long, requires = "password")]
    ssid: Option<String>,
    /// WiFi password
    #[arg(long, requires = "ssid")]
    password: Option<String>,
    /// WiFi credentials file (SSID on line 1, password on line 2)
    #[arg(short, long, default_value = "wifi_credentials.txt")]
    file: PathBuf,
}

impl Network {
    fn resolve(self) -> Result<(String, String), ControllerError> {
        match (self.ssid, self.password) {
            (Some(ssid), Some(password)) => Ok((ssid, password)),
            _ => read_wifi_credentials(&self.file),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { duration } => {
            scan_devices(duration).await?;
        }
        Commands::Save {
            target,
            network,
            fcm_url,
            fcm_token,
        } => {
            let (ssid, password) = network.resolve()?;
            let endpoint = match (fcm_url.as_deref(), fcm_token.as_deref()) {
                (Some(url), Some(token)) => Some(Endpoint { url, token }),
                _ => None,
            };

            println!("Saving network {ssid}...");
            ble::save_network(target.device.as_deref(), &ssid, &password, endpoint.as_ref())
                .await?;
            println!("Network saved!");
        }
        Commands::Connect {
            target,
            stored,
            network,
        } => {
            if stored {
                println!("Connecting to the first stored network...");
                ble::connect_stored(target.device.as_deref()).await?;
            } else {
                let (ssid, password) = network.resolve()?;
                println!("Connecting to {ssid}...");
                ble::connect(target.device.as_deref(), &ssid, &password).await?;
            }
            println!("Connect command sent! The device drops BLE while it joins WiFi.");
        }
        Commands::Clear { target } => {
            ble::clear(target.device.as_deref()).await?;
            println!("Stored networks cleared.");
        }
        Commands::Disconnect { target } => {
            ble::disconnect(target.device.as_deref()).await?;
            println!("Disconnect command sent.");
        }
        Commands::PairingStatus { target } => {
            let status = ble::pairing_status(target.device.as_deref()).await?;
            match status {
                PairingStatus::Paired => println!("Paired"),
                PairingStatus::NotPaired => println!("Not paired"),
            }
        }
    }

    Ok(())
}

/// Parse a credentials file: SSID on line 1, password on line 2
///
/// The password line may be empty for open networks.
fn parse_wifi_credentials(content: &str) -> Result<(String, String), ControllerError> {
    let mut lines = content.lines();
    let ssid = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ControllerError::InvalidInput("Missing SSID in credentials file".into()))?
        .to_string();
    let password = lines
        .next()
        .ok_or_else(|| ControllerError::InvalidInput("Missing password in credentials file".into()))?
        .trim()
        .to_string();
    Ok((ssid, password))
}

fn read_wifi_credentials(file: &Path) -> Result<(String, String), ControllerError> {
    let content = std::fs::read_to_string(file).map_err(|e| {
        ControllerError::InvalidInput(format!("Cannot read {}: {e}", file.display()))
    })?;
    parse_wifi_credentials(&content)
}

async fn scan_devices(duration: u64) -> Result<(), ControllerError> {
    println!("Scanning for PicoFCM devices ({duration} seconds)...");

    let devices = ble::scan(duration).await?;
    info!("Scan finished with {} devices", devices.len());

    println!("\nFound {} devices:", devices.len());
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| format!("{r} dBm"))
            .unwrap_or_else(|| "N/A".to_string());
        let marker = if device.is_picofcm { " [PICOFCM]" } else { "" };

        println!("  {} ({}) RSSI: {}{}", device.name, device.address, rssi, marker);
    }

    Ok(())
}
