use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use oscgen_core::traits::update_rate_mhz;
use oscgen_core::waveform::{synthesize, WaveParams, WaveformTable};
use oscgen_host::generator::parse_codes;
use oscgen_host::{
    list_ports, open_port, GeneratorClient, HostConfig, LatestCapture, ScopeClient,
    ScopeReceiver, Shape,
};

#[derive(Parser, Debug)]
#[command(about = "Drive the oscgen waveform generator and oscilloscope")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "oscgen.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports
    Ports,
    /// Waveform generator
    #[command(subcommand)]
    Gen(GenCommand),
    /// Oscilloscope
    #[command(subcommand)]
    Scope(ScopeCommand),
    /// Print the table a shape synthesizes to, without a board
    Preview {
        shape: Shape,
        #[arg(long, default_value_t = 1000)]
        amplitude: u16,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i16,
        #[arg(long, default_value_t = 500)]
        duty: u16,
    },
}

#[derive(Subcommand, Debug)]
enum GenCommand {
    /// Select the wave shape
    Wave { shape: Shape },
    /// Set the frequency in hertz
    Freq { hz: f64 },
    /// Set the peak-to-peak amplitude in millivolts
    Ampl { mv_pp: u16 },
    /// Set the DC offset in millivolts
    Offset {
        #[arg(allow_negative_numbers = true)]
        mv: i16,
    },
    /// Set the square wave duty cycle in 1/1000
    Duty { per_mille: u16 },
    /// Upload a table of raw DAC codes from a text file
    Upload { file: PathBuf },
    /// Send every setting from the config file
    Apply,
    /// Query what the generator is producing
    Status,
}

#[derive(Subcommand, Debug)]
enum ScopeCommand {
    /// Start streaming
    Start,
    /// Stop streaming
    Stop,
    /// Set the sample rate in hertz
    Rate { hz: u32 },
    /// Stream and print a summary of each capture
    Watch {
        /// Seconds to watch for (0 = until interrupted)
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = HostConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.command {
        Command::Ports => {
            for port in list_ports()? {
                println!("{port}");
            }
        }
        Command::Gen(cmd) => run_generator(&config, cmd)?,
        Command::Scope(cmd) => run_scope(&config, cmd)?,
        Command::Preview {
            shape,
            amplitude,
            offset,
            duty,
        } => {
            let params = WaveParams {
                kind: shape.into(),
                amplitude_mv_pp: amplitude,
                offset_mv: offset,
                duty_per_mille: duty,
            };
            let mut table = WaveformTable::new();
            anyhow::ensure!(
                synthesize(&params, &mut table),
                "user tables are uploaded, not synthesized"
            );
            for (i, code) in table.samples().iter().enumerate() {
                println!("{i}\t{code}");
            }
        }
    }
    Ok(())
}

fn run_generator(config: &HostConfig, cmd: GenCommand) -> anyhow::Result<()> {
    let port = open_port(&config.generator)
        .with_context(|| format!("opening generator port {}", config.generator.path))?;
    let mut client = GeneratorClient::new(port);

    match cmd {
        GenCommand::Wave { shape } => {
            client.set_wave(shape)?;
        }
        GenCommand::Freq { hz } => {
            client.set_frequency(hz)?;
        }
        GenCommand::Ampl { mv_pp } => {
            client.set_amplitude(mv_pp)?;
        }
        GenCommand::Offset { mv } => {
            client.set_offset(mv)?;
        }
        GenCommand::Duty { per_mille } => {
            client.set_duty(per_mille)?;
        }
        GenCommand::Upload { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let codes = parse_codes(&text)?;
            client.upload_table(&codes)?;
            info!("uploaded {} points", codes.len());
        }
        GenCommand::Apply => client.apply(&config.waveform)?,
        GenCommand::Status => {
            let status = client.query_status()?;
            println!("kind:      {:?}", status.kind);
            println!("frequency: {:.3} Hz", status.frequency_mhz as f64 / 1000.0);
            println!("amplitude: {} mVpp", status.amplitude_mv_pp);
            println!("offset:    {} mV", status.offset_mv);
            println!("duty:      {}/1000", status.duty_per_mille);
            println!("points:    {}", status.table_len);
            let rate = update_rate_mhz(status.frequency_mhz, status.table_len);
            println!("update:    {:.1} samples/s", rate as f64 / 1000.0);
        }
    }
    Ok(())
}

fn run_scope(config: &HostConfig, cmd: ScopeCommand) -> anyhow::Result<()> {
    let port = open_port(&config.scope)
        .with_context(|| format!("opening scope port {}", config.scope.path))?;

    match cmd {
        ScopeCommand::Start => {
            ScopeClient::new(port).start()?;
        }
        ScopeCommand::Stop => {
            ScopeClient::new(port).stop()?;
        }
        ScopeCommand::Rate { hz } => {
            ScopeClient::new(port).set_sample_rate(hz)?;
        }
        ScopeCommand::Watch { seconds } => {
            let reader = port.try_clone().context("cloning scope port")?;
            let latest = LatestCapture::new();
            let receiver = ScopeReceiver::spawn(reader, latest.clone())?;
            let mut client = ScopeClient::new(port);
            client.start()?;

            let deadline = (seconds > 0).then(|| Instant::now() + Duration::from_secs(seconds));
            while deadline.map_or(true, |d| Instant::now() < d) && !receiver.is_finished() {
                thread::sleep(Duration::from_millis(250));
                if let Some(capture) = latest.take() {
                    let (min, max) = capture.range().unwrap_or((0, 0));
                    println!(
                        "#{:<5} {} samples @ {} Hz  min {min} max {max}",
                        capture.sequence,
                        capture.samples.len(),
                        capture.header.sample_rate_hz,
                    );
                }
            }

            client.stop()?;
            let stats = receiver.stop()?;
            println!(
                "{} captures, {} missed, {} CRC errors",
                stats.captures, stats.missed, stats.link.crc_errors
            );
        }
    }
    Ok(())
}
