use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::Parser;

use replay_core::{
    AudioSource, ExportedFile, OutputEncoding, ReplayConfiguration, ReplayDelegate, ReplayError, ReplaySession, TriggerState,
    DEFAULT_DURATION_SECS,
};
use replay_cpal::{signal, CpalInputCapture, DeviceEnumerator};

/// How often the main loop checks the signal flags.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Keep the last few seconds of audio input and save them on demand.
///
/// Send SIGUSR1 to the process to write the current window to a WAV file.
#[derive(Parser, Debug)]
#[command(name = "replay", version)]
struct Cli {
    /// List input and output devices, then start capturing
    #[arg(long)]
    list_devices: bool,

    /// Input device id (as shown by --list-devices); defaults to the system default
    #[arg(long, value_name = "ID")]
    device: Option<String>,

    /// Length of the replay window in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_DURATION_SECS,
          value_parser = clap::value_parser!(u32).range(1..))]
    duration: u32,

    /// Directory for exported files
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Sample encoding of exported files: pcm16, pcm24, pcm32 or float32
    #[arg(long, value_name = "ENCODING", default_value_t = OutputEncoding::Pcm24)]
    encoding: OutputEncoding,

    /// Write a JSON metadata file next to every export
    #[arg(long)]
    metadata: bool,
}

/// Reports exports on stdout so scripts can pick up the file names.
struct ConsoleDelegate;

impl ReplayDelegate for ConsoleDelegate {
    fn on_trigger_state_changed(&self, state: TriggerState) {
        log::debug!("Trigger state: {:?}", state);
    }

    fn on_export_finished(&self, file: &ExportedFile) {
        println!("{}", file.file_path.display());
    }

    fn on_error(&self, error: &ReplayError) {
        eprintln!("replay: export failed: {}", error);
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                return ExitCode::FAILURE;
            }
        },
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("replay: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ReplayError> {
    let devices = DeviceEnumerator::new();

    if cli.list_devices {
        print_devices(&devices)?;
    }

    let input = match cli.device {
        Some(ref id) => {
            let device = devices
                .find_input_device(id)?
                .ok_or_else(|| ReplayError::DeviceError(format!("Invalid device id: {}", id)))?;
            let is_default = devices
                .list_input_devices()?
                .iter()
                .any(|source| source.is_default && source.id == *id);
            CpalInputCapture::new(device, is_default)
        }
        None => CpalInputCapture::new(devices.default_input_device()?, true),
    };

    let config = ReplayConfiguration {
        duration_secs: cli.duration,
        output_directory: cli.output_dir,
        output_encoding: cli.encoding,
        write_metadata: cli.metadata,
        ..Default::default()
    };

    let mut session = ReplaySession::new(input, config)?;
    session.set_delegate(Arc::new(ConsoleDelegate));
    signal::install_handlers()?;

    let format = session.start()?;
    log::info!(
        "Keeping the last {}s of {} ({}); send SIGUSR1 to pid {} to save it",
        session.config().duration_secs,
        session.provider().name(),
        format,
        std::process::id()
    );

    while !signal::shutdown_requested() {
        if signal::take_trigger() {
            match session.trigger() {
                Ok(()) => {}
                Err(ReplayError::Busy) => log::warn!("Export already in progress; trigger ignored"),
                Err(e) => log::error!("Trigger failed: {}", e),
            }
        }
        thread::sleep(POLL_INTERVAL);
    }

    log::info!("Shutting down");
    session.stop()
}

/// Device listing goes to stderr so stdout carries only exported file names.
fn print_devices(devices: &DeviceEnumerator) -> Result<(), ReplayError> {
    let inputs = devices.list_input_devices()?;
    let outputs = devices.list_output_devices()?;
    eprint!("{}", device_listing(&inputs, &outputs));
    Ok(())
}

fn device_listing(inputs: &[AudioSource], outputs: &[AudioSource]) -> String {
    let mut listing = String::new();
    for (heading, sources) in [("Input devices:", inputs), ("Output devices:", outputs)] {
        listing.push_str(heading);
        listing.push('\n');
        for source in sources {
            listing.push_str(&format!("  {}\n", source.to_string().replace('\n', "\n  ")));
        }
    }
    listing.push_str(&format!("{} devices found\n", inputs.len() + outputs.len()));
    listing
}
