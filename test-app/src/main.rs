// shack test application -- CLI tool for exercising the station peripherals
// (CW keyer, VFO board, radio) and the DX/ADIF readers against real
// hardware or the simulated bench.
//
// Usage:
//   shack-test-app ports
//   shack-test-app discover
//   shack-test-app cw --mode keyer --tone 650 --volume 5 --wpm 22
//   shack-test-app vfo split on
//   shack-test-app vfo tx --band 20m --mhz 14.025
//   shack-test-app vfo band
//   shack-test-app radio memory 1 "CQ TEST AD2CC"
//   shack-test-app radio key --fkey 112
//   shack-test-app dx listing.txt --call AD2CC --worked KE0YDN,PR6T
//   shack-test-app adif lotwreport.adi --confirmed
//   shack-test-app --mock vfo band

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use shack::lex::{mark_needed, parse_adif, parse_spots};
use shack::remote::discovery::{DEFAULT_VENDOR_IDS, find_ports};
use shack::remote::function_key_slot;
use shack::transport::SerialPortProvider;
use shack::{CwMode, PortProvider, RegistryBuilder, RemoteRegistry, VfoChannel};
use shack_test_harness::{SimBench, SimDevice};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// shack test application -- exercises station peripherals from the command line.
#[derive(Parser)]
#[command(name = "shack-test-app", version, about)]
struct Cli {
    /// Log filter (e.g. info, debug, shack_remote=trace). RUST_LOG wins when set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Use the simulated bench instead of real serial ports.
    #[arg(long)]
    mock: bool,

    /// Baud rate for every port.
    #[arg(long, default_value_t = 38_400)]
    baud: u32,

    /// Read timeout per reply, in milliseconds.
    #[arg(long, default_value_t = 150)]
    timeout_ms: u64,

    /// Probe attempts per address during discovery.
    #[arg(long, default_value_t = 1)]
    probe_attempts: u32,

    /// Only consider USB ports from these vendor ids (hex, comma separated).
    /// `default` selects the usual bridge chips (10c4, 2341).
    #[arg(long, value_delimiter = ',', value_parser = parse_vid)]
    vendor: Vec<VendorFilter>,

    /// Identifier the radio answers to `ID;` with.
    #[arg(long, default_value = "0761")]
    radio_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy)]
enum VendorFilter {
    Defaults,
    Vid(u16),
}

/// Parse a hex vendor id like "10c4" or "0x10c4", or the word "default".
fn parse_vid(s: &str) -> std::result::Result<VendorFilter, String> {
    if s.eq_ignore_ascii_case("default") {
        return Ok(VendorFilter::Defaults);
    }
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(s, 16)
        .map(VendorFilter::Vid)
        .map_err(|e| format!("invalid vendor id: {e}"))
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports and whether they pass the vendor filter.
    Ports,

    /// Discover every peripheral and print the registry status.
    Discover,

    /// Configure the CW keyer board.
    Cw {
        #[arg(long, value_enum, default_value = "keyer")]
        mode: CwModeArg,

        /// Sidetone frequency in hertz.
        #[arg(long, default_value_t = 650)]
        tone: u16,

        /// Sidetone volume.
        #[arg(long, default_value_t = 5)]
        volume: u8,

        /// Keyer speed in words per minute.
        #[arg(long, default_value_t = 22)]
        wpm: u32,
    },

    /// VFO board operations.
    Vfo {
        #[command(subcommand)]
        action: VfoAction,
    },

    /// Radio CAT operations.
    Radio {
        #[command(subcommand)]
        action: RadioAction,
    },

    /// Parse a DX-cluster listing and print its spots.
    Dx {
        file: PathBuf,

        /// Operator callsign that brackets the listing.
        #[arg(long)]
        call: String,

        /// Calls already worked (comma separated); the rest are marked needed.
        #[arg(long, value_delimiter = ',')]
        worked: Vec<String>,
    },

    /// Parse an ADIF (LoTW) export and print its records.
    Adif {
        file: PathBuf,

        /// Only print records with a received QSL.
        #[arg(long)]
        confirmed: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CwModeArg {
    Tutor,
    Keyer,
}

impl From<CwModeArg> for CwMode {
    fn from(m: CwModeArg) -> Self {
        match m {
            CwModeArg::Tutor => CwMode::Tutor,
            CwModeArg::Keyer => CwMode::Keyer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OnOff {
    On,
    Off,
}

#[derive(Subcommand)]
enum VfoAction {
    /// Turn split operation on or off.
    Split { state: OnOff },

    /// Tune the transmit channel.
    Tx {
        #[command(flatten)]
        tune: TuneArgs,
    },

    /// Tune the receive channel.
    Rx {
        #[command(flatten)]
        tune: TuneArgs,
    },

    /// Read the band switch and transmit state.
    Band,
}

#[derive(clap::Args)]
struct TuneArgs {
    /// Band label (10m, 15m, 20m, 40m, 80m, 160m, WWV, Aux).
    /// Defaults to the band the switch is on.
    #[arg(long)]
    band: Option<String>,

    /// Frequency in MHz.
    #[arg(long, conflicts_with = "word", required_unless_present = "word")]
    mhz: Option<f64>,

    /// Raw 32-bit DDS tuning word.
    #[arg(long)]
    word: Option<u32>,
}

#[derive(Subcommand)]
enum RadioAction {
    /// Ask the radio for its identifier.
    Id,

    /// Load text into a keyer memory (slots 1-5).
    Memory { slot: u8, text: String },

    /// Play a keyer memory by slot (1-10) or browser function key code (112-121).
    Key {
        #[arg(required_unless_present = "fkey", conflicts_with = "fkey")]
        slot: Option<u8>,

        #[arg(long)]
        fkey: Option<u32>,
    },
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// A bench with every peripheral plugged in and powered.
fn mock_bench(radio_id: &str) -> SimBench {
    let bench = SimBench::new();
    bench.plug("/dev/ttyUSB0", SimDevice::vfo());
    bench.plug("/dev/ttyUSB1", SimDevice::cw_keyer());
    bench.plug("/dev/ttyUSB2", SimDevice::radio(radio_id));
    bench.add_native("/dev/ttyS0");
    // 20m, receiving.
    bench.set_band_status("/dev/ttyUSB0", 0x03);
    bench
}

fn create_provider(cli: &Cli) -> Box<dyn PortProvider> {
    if cli.mock {
        println!("Using simulated bench");
        Box::new(mock_bench(&cli.radio_id))
    } else {
        Box::new(SerialPortProvider::new())
    }
}

fn vendor_ids(cli: &Cli) -> Vec<u16> {
    let mut vids = Vec::new();
    for v in &cli.vendor {
        match v {
            VendorFilter::Defaults => vids.extend_from_slice(&DEFAULT_VENDOR_IDS),
            VendorFilter::Vid(vid) => vids.push(*vid),
        }
    }
    vids
}

fn builder(cli: &Cli) -> RegistryBuilder {
    RegistryBuilder::new()
        .baud_rate(cli.baud)
        .read_timeout(Duration::from_millis(cli.timeout_ms))
        .probe_attempts(cli.probe_attempts)
        .vendor_filter(&vendor_ids(cli))
        .radio_id(&cli.radio_id)
}

// ---------------------------------------------------------------------------
// Port and registry commands
// ---------------------------------------------------------------------------

fn cmd_ports(cli: &Cli, provider: &dyn PortProvider) -> Result<()> {
    let ports = provider.list_ports().context("failed to list serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }
    let vids = vendor_ids(cli);
    let matching: Vec<String> = match find_ports(provider, &vids) {
        Ok(found) => found.into_iter().map(|p| p.name).collect(),
        Err(_) => Vec::new(),
    };
    for port in &ports {
        let mark = if matching.contains(&port.name) { "*" } else { " " };
        println!("{mark} {port}");
    }
    println!();
    println!("{} ports, {} candidates (*).", ports.len(), matching.len());
    Ok(())
}

fn print_status(statuses: &[shack::RemoteStatus]) {
    for status in statuses {
        println!("  {status}");
    }
}

async fn cmd_discover(registry: &RemoteRegistry) -> Result<()> {
    println!("Remote devices");
    print_status(&registry.status().await);
    Ok(())
}

// ---------------------------------------------------------------------------
// Peripheral commands
// ---------------------------------------------------------------------------

async fn cmd_cw(registry: &RemoteRegistry, mode: CwMode, tone: u16, volume: u8, wpm: u32) -> Result<()> {
    registry
        .send_cw(mode, tone, volume, wpm)
        .await
        .context("failed to configure the CW board")?;
    println!("CW: {mode:?}, {tone} Hz, volume {volume}, {wpm} wpm");
    Ok(())
}

async fn cmd_tune(registry: &RemoteRegistry, channel: VfoChannel, tune: &TuneArgs) -> Result<()> {
    if let Some(word) = tune.word {
        registry.set_frequency(channel, word).await?;
        println!("{channel}: word {word}");
        return Ok(());
    }
    let Some(mhz) = tune.mhz else {
        bail!("--mhz or --word is required");
    };
    let band = match &tune.band {
        Some(band) => band.clone(),
        None => {
            let status = registry.read_band().await.context("failed to read the band switch")?;
            status.selection().label.to_string()
        }
    };
    let word = registry
        .set_frequency_mhz(channel, &band, mhz)
        .await
        .with_context(|| format!("failed to tune {channel} to {mhz} MHz on {band}"))?;
    println!("{channel}: {mhz:.6} MHz on {band} (word {word})");
    Ok(())
}

async fn cmd_vfo(registry: &RemoteRegistry, action: &VfoAction) -> Result<()> {
    match action {
        VfoAction::Split { state } => {
            let on = matches!(state, OnOff::On);
            registry.set_split(on).await?;
            println!("Split: {}", if on { "ON" } else { "OFF" });
        }
        VfoAction::Tx { tune } => cmd_tune(registry, VfoChannel::Tx, tune).await?,
        VfoAction::Rx { tune } => cmd_tune(registry, VfoChannel::Rx, tune).await?,
        VfoAction::Band => {
            let status = registry.read_band().await?;
            let selection = status.selection();
            println!("Band: {} ({})", selection.label, selection.sideband);
            println!("TX:   {}", if status.transmitting() { "ON" } else { "OFF" });
            if let Some(plan) = selection.plan() {
                println!(
                    "Plan: {:.3}-{:.3} MHz, CW below {:.3} MHz",
                    plan.lower_mhz, plan.upper_mhz, plan.cw_boundary_mhz
                );
            }
        }
    }
    Ok(())
}

async fn cmd_radio(registry: &RemoteRegistry, action: &RadioAction) -> Result<()> {
    match action {
        RadioAction::Id => {
            let id = registry.identify_radio().await?;
            println!("Radio ID: {id}");
        }
        RadioAction::Memory { slot, text } => {
            registry.load_keyer_memory(*slot, text).await?;
            println!("Memory {slot}: {}", text.to_uppercase());
        }
        RadioAction::Key { slot, fkey } => {
            let slot = match (slot, fkey) {
                (Some(slot), _) => *slot,
                (None, Some(code)) => function_key_slot(*code)?,
                (None, None) => bail!("a slot or --fkey is required"),
            };
            registry.play_keyer_memory(slot).await?;
            println!("Playing memory {slot}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// File commands
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn cmd_dx(path: &Path, my_call: &str, worked: &[String]) -> Result<()> {
    let input = read_file(path)?;
    let mut spots = parse_spots(&input, my_call).context("failed to parse the DX listing")?;
    let worked: std::collections::HashSet<String> =
        worked.iter().map(|c| c.trim().to_ascii_uppercase()).collect();
    let needed = mark_needed(&mut spots, &worked);

    for spot in &spots {
        println!(
            "{} {:>9} {:<12} {} {} {:<30} <{}>",
            if spot.needed { "*" } else { " " },
            spot.frequency,
            spot.dx_call,
            spot.date,
            spot.time,
            spot.info.trim(),
            spot.spotter
        );
    }
    println!();
    println!("{} spots, {needed} needed (*).", spots.len());
    Ok(())
}

fn cmd_adif(path: &Path, confirmed_only: bool) -> Result<()> {
    let input = read_file(path)?;
    let records = parse_adif(&input).context("failed to parse the ADIF file")?;
    let mut shown = 0;
    for record in records.iter().filter(|r| !confirmed_only || r.qsl_received()) {
        let when = match record.qso_time() {
            Ok(t) => t.format("%Y-%m-%d %H:%M").to_string(),
            Err(_) => "-".to_string(),
        };
        println!(
            "{:<12} {:<5} {:<5} {:<16} {}",
            record.call().unwrap_or("-"),
            record.band().unwrap_or("-"),
            record.mode().unwrap_or("-"),
            when,
            if record.qsl_received() { "QSL" } else { "" }
        );
        shown += 1;
    }
    println!();
    println!("{shown} of {} records.", records.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    // File commands need no hardware.
    match &cli.command {
        Command::Dx { file, call, worked } => return cmd_dx(file, call, worked),
        Command::Adif { file, confirmed } => return cmd_adif(file, *confirmed),
        _ => {}
    }

    let provider = create_provider(&cli);
    if matches!(cli.command, Command::Ports) {
        return cmd_ports(&cli, provider.as_ref());
    }

    let registry = builder(&cli).build_and_discover(provider).await;

    let result = match &cli.command {
        Command::Discover => cmd_discover(&registry).await,
        Command::Cw {
            mode,
            tone,
            volume,
            wpm,
        } => cmd_cw(&registry, (*mode).into(), *tone, *volume, *wpm).await,
        Command::Vfo { action } => cmd_vfo(&registry, action).await,
        Command::Radio { action } => cmd_radio(&registry, action).await,
        Command::Ports => unreachable!("ports handled above"),
        Command::Dx { .. } => unreachable!("dx handled above"),
        Command::Adif { .. } => unreachable!("adif handled above"),
    };

    registry.shutdown().await;
    result
}
