use std::path::PathBuf;

use clap::{Args, Subcommand};
use periphlink_frame::sysex::DEFAULT_MAX_FRAME_LEN;
use periphlink_router::{DeviceConfig, DEFAULT_PLATFORM_ID};

use crate::exit::CliResult;
use crate::output::OutputFormat;
use crate::sim::LibraryKind;

pub mod describe;
pub mod serve;
pub mod unpack;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer command frames from a simulated board on stdio or a device node.
    Serve(ServeArgs),
    /// Print the device description the simulated board reports.
    Describe(DescribeArgs),
    /// Decode 7-bit packed bytes.
    Unpack(UnpackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Describe(args) => describe::run(args, format),
        Command::Unpack(args) => unpack::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Simulated device settings shared by `serve` and `describe`.
#[derive(Args, Debug, Clone)]
pub struct BoardArgs {
    /// Platform id reported in the device description.
    #[arg(long, env = "PERIPHLINK_PLATFORM", default_value = DEFAULT_PLATFORM_ID)]
    pub platform: String,
    /// Emit diagnostic trace messages with each reply.
    #[arg(long)]
    pub diagnostics: bool,
    /// Peripheral libraries to register, in slot order (comma-separated).
    #[arg(long, value_delimiter = ',', default_values = ["i2c", "servo", "spi"])]
    pub libraries: Vec<LibraryKind>,
}

impl BoardArgs {
    pub fn config(&self) -> DeviceConfig {
        DeviceConfig {
            platform_id: self.platform.clone(),
            diagnostics_enabled: self.diagnostics,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub board: BoardArgs,
    /// Serial device node to serve instead of stdin/stdout.
    #[arg(long, value_name = "PATH", env = "PERIPHLINK_DEVICE")]
    pub device: Option<PathBuf>,
    /// Wait for input between polls, in milliseconds.
    #[arg(long, value_name = "MS", default_value = "10")]
    pub idle_wait_ms: u64,
    /// Largest accepted SysEx envelope in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FRAME_LEN)]
    pub max_frame_len: usize,
}

#[derive(Args, Debug)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub board: BoardArgs,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Packed bytes as hex (e.g. "2004 00" or "0x20,0x04,0x00").
    pub packed: String,
    /// Number of raw bytes to decode. Default: as many as the input carries.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
