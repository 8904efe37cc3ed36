//! A small command-line front end over [`enip_scan::Scanner`], for
//! exercising discovery, Assembly, tag, and Motoman operations against
//! real or simulated hardware by hand. Not part of the crate's public
//! contract — this is ambient tooling, built the way the rest of this
//! crate's dev-dependency stack is: `clap` for argument parsing,
//! `tracing-subscriber` for turning `--debug` into actual log output.

use clap::{Parser, Subcommand};
use enip_scan::{datatype::CipType, Scanner, ScannerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanner-cli", about = "Manual EtherNet/IP + CIP scanner probe")]
struct Cli {
    /// Operation timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Install a `tracing` subscriber at `debug` level instead of
    /// `info`.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Broadcast ListIdentity and print every device that answers.
    Discover {
        #[arg(long, default_value_t = 32)]
        max_devices: usize,
    },
    /// Read an Assembly instance's Data attribute.
    ReadAssembly { endpoint: SocketAddr, instance: u32 },
    /// Write bytes (hex, no separator) to an Assembly instance's Data
    /// attribute.
    WriteAssembly {
        endpoint: SocketAddr,
        instance: u32,
        hex_bytes: String,
    },
    /// Read a Micro800 symbolic tag.
    ReadTag { endpoint: SocketAddr, tag_path: String },
    /// Write a DINT value to a Micro800 symbolic tag.
    WriteTagDint {
        endpoint: SocketAddr,
        tag_path: String,
        value: i32,
    },
    /// Read a Motoman scalar variable or register by class/number.
    ReadMotomanVariable {
        endpoint: SocketAddr,
        class: String,
        number: u32,
        #[arg(long)]
        rs022: bool,
    },
}

fn parse_class(s: &str) -> u32 {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).expect("class must be a hex (0x..) or decimal number")
    } else {
        s.parse().expect("class must be a hex (0x..) or decimal number")
    }
}

fn parse_hex_bytes(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("hex_bytes must be an even number of hex digits"))
        .collect()
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { "enip_scan=debug" } else { "enip_scan=info" };
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter)).init();

    let max_devices = match &cli.command {
        Command::Discover { max_devices } => *max_devices,
        _ => ScannerConfig::default().max_devices,
    };
    let config = ScannerConfig {
        timeout: Duration::from_millis(cli.timeout_ms),
        debug: cli.debug,
        max_devices,
        ..ScannerConfig::default()
    };
    let scanner = Scanner::new(config);
    scanner.init().expect("Scanner::init never fails");

    match cli.command {
        Command::Discover { .. } => {
            match scanner.discover() {
                Ok(devices) => {
                    for device in devices {
                        println!(
                            "{:<15} vendor=0x{:04X} product=0x{:04X} rev={}.{} name={:?}",
                            device.address,
                            device.vendor_id,
                            device.product_code,
                            device.revision_major,
                            device.revision_minor,
                            device.product_name
                        );
                    }
                }
                Err(e) => eprintln!("discover failed: {e}"),
            }
        }
        Command::ReadAssembly { endpoint, instance } => match scanner.read_assembly(endpoint, instance) {
            Ok(data) => println!("{data:02X?}"),
            Err(e) => eprintln!("read_assembly failed: {e}"),
        },
        Command::WriteAssembly {
            endpoint,
            instance,
            hex_bytes,
        } => {
            let data = parse_hex_bytes(&hex_bytes);
            if let Err(e) = scanner.write_assembly(endpoint, instance, &data) {
                eprintln!("write_assembly failed: {e}");
            }
        }
        #[cfg(feature = "tags")]
        Command::ReadTag { endpoint, tag_path } => match scanner.read_tag(endpoint, &tag_path) {
            Ok(value) => println!("type=0x{:02X} bytes={:02X?}", value.data_type.code(), value.bytes),
            Err(e) => eprintln!("read_tag failed: {e}"),
        },
        #[cfg(not(feature = "tags"))]
        Command::ReadTag { .. } => eprintln!("built without the `tags` feature"),
        #[cfg(feature = "tags")]
        Command::WriteTagDint {
            endpoint,
            tag_path,
            value,
        } => {
            if let Err(e) = scanner.write_tag(endpoint, &tag_path, CipType::Dint, &value.to_le_bytes()) {
                eprintln!("write_tag failed: {e}");
            }
        }
        #[cfg(not(feature = "tags"))]
        Command::WriteTagDint { .. } => eprintln!("built without the `tags` feature"),
        #[cfg(feature = "motoman")]
        Command::ReadMotomanVariable {
            endpoint,
            class,
            number,
            rs022,
        } => {
            scanner.set_rs022_instance_direct(rs022);
            match scanner.read_motoman_variable(endpoint, parse_class(&class), number) {
                Ok(data) => println!("{data:02X?}"),
                Err(e) => eprintln!("read_motoman_variable failed: {e}"),
            }
        }
        #[cfg(not(feature = "motoman"))]
        Command::ReadMotomanVariable { .. } => eprintln!("built without the `motoman` feature"),
    }

    scanner.shutdown().expect("Scanner::shutdown never fails");
}
