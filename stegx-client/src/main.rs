//! stegx - Steganographic carrier client
//!
//! Command-line front end for the remote stego service: hide a message or
//! file in an audio, video, image or text carrier, recover it again, and
//! synthesize WAV carriers locally.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use stegx_client::selftest::{run_self_test, SelfTestConfig};
use stegx_client::{
    DecodeRequest, EmbedOptions, EmbedResult, EncodeRequest, HttpBackend, Orchestrator,
    StegoBackend,
};
use stegx_common::config::{
    default_config_path, init_toml_config, load_toml_config, normalize_endpoint, ClientConfig,
    TomlConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS,
};
use stegx_common::wav::{encode_wav, sine_wave};
use stegx_common::{classify, CarrierFile, DecodeResult, ProgressReporter, SecretFile, SecretPayload};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for stegx
#[derive(Parser, Debug)]
#[command(name = "stegx")]
#[command(about = "Hide and recover secrets in media carriers via a stego service")]
#[command(version)]
struct Args {
    /// Stego service base URL
    #[arg(short, long, global = true, env = "STEGX_API_URL")]
    endpoint: Option<String>,

    /// Config file (defaults to <config dir>/stegx/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Password and encryption toggle shared by every service call
#[derive(ClapArgs, Debug, Clone)]
struct KeyArgs {
    /// Password used to encrypt or decrypt the payload
    #[arg(short, long, default_value = "")]
    password: String,

    /// Send the payload unencrypted
    #[arg(long)]
    no_encrypt: bool,
}

impl KeyArgs {
    fn encrypt(&self) -> bool {
        !self.no_encrypt
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hide a message and/or file in an audio, video or image carrier
    Embed {
        /// Carrier file
        #[arg(long)]
        carrier: PathBuf,

        /// Secret message
        #[arg(short, long)]
        message: Option<String>,

        /// Secret file (not supported for audio carriers)
        #[arg(long)]
        secret_file: Option<PathBuf>,

        #[command(flatten)]
        key: KeyArgs,

        /// Disable error correction (audio and video)
        #[arg(long)]
        no_ecc: bool,

        /// Output container for video carriers
        #[arg(long)]
        container: Option<String>,

        /// Where to write the stego carrier
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Recover a hidden payload from an audio, video or image carrier
    Extract {
        /// Carrier file
        #[arg(long)]
        carrier: PathBuf,

        #[command(flatten)]
        key: KeyArgs,

        /// Directory for a recovered secret file
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Watermark a host text with a hidden message
    EmbedText {
        /// Host text
        #[arg(long, conflicts_with = "host_file", required_unless_present = "host_file")]
        host_text: Option<String>,

        /// File holding the host text
        #[arg(long)]
        host_file: Option<PathBuf>,

        /// Secret message
        #[arg(short, long)]
        message: String,

        #[command(flatten)]
        key: KeyArgs,

        /// Write the watermarked text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recover a hidden message from watermarked text
    ExtractText {
        /// Watermarked text
        #[arg(long, conflicts_with = "text_file", required_unless_present = "text_file")]
        text: Option<String>,

        /// File holding the watermarked text
        #[arg(long)]
        text_file: Option<PathBuf>,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// Write a sine-tone WAV file
    SynthWav {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "440")]
        frequency: f32,

        /// Duration in seconds
        #[arg(long, default_value = "1.0")]
        duration: f32,

        #[arg(long, default_value = "44100")]
        sample_rate: u32,
    },

    /// Round-trip a message through a synthesized WAV carrier
    SelfTest {
        #[arg(short, long, default_value = "hello")]
        message: String,

        /// Password (empty runs without encryption)
        #[arg(short, long, default_value = "")]
        password: String,
    },

    /// Print the carrier kind of a file
    Classify { path: PathBuf },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a starter config file (uses --endpoint when given)
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(&args).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::SynthWav {
            output,
            frequency,
            duration,
            sample_rate,
        } => synth_wav(&output, frequency, duration, sample_rate),
        Command::Classify { path } => {
            let carrier = read_carrier(&path)?;
            println!("{}", carrier.kind());
            Ok(())
        }
        Command::Config { action } => {
            run_config(action, args.endpoint.as_deref(), args.config.as_deref())
        }
        command => {
            let config = ClientConfig::resolve(args.endpoint.as_deref(), args.config.as_deref())
                .context("Failed to resolve configuration")?;
            let backend = HttpBackend::new(&config).context("Failed to create HTTP client")?;
            run_remote(Orchestrator::new(backend), command).await
        }
    }
}

/// Default log filter: `--verbose`, else the config file's level, else info
fn default_filter(args: &Args) -> String {
    let level = if args.verbose {
        "debug".to_string()
    } else {
        args.config
            .clone()
            .or_else(default_config_path)
            .filter(|path| path.exists())
            .and_then(|path| load_toml_config(&path).ok())
            .map(|config| config.logging.level)
            .unwrap_or_else(|| "info".to_string())
    };
    format!("stegx={0},stegx_client={0},stegx_common={0}", level)
}

/// Progress reporter that logs each checkpoint
fn log_progress(label: &'static str) -> ProgressReporter {
    ProgressReporter::new(move |fraction| {
        info!("{}: {:>3.0}%", label, fraction * 100.0);
    })
}

async fn run_remote<B: StegoBackend>(orchestrator: Orchestrator<B>, command: Command) -> Result<()> {
    info!("Using stego service at {}", orchestrator.backend().endpoint());

    match command {
        Command::Embed {
            carrier,
            message,
            secret_file,
            key,
            no_ecc,
            container,
            output,
        } => {
            let carrier = read_carrier(&carrier)?;
            let file = match secret_file {
                Some(path) => Some(read_secret_file(&path)?),
                None => None,
            };
            let request = EncodeRequest::new(carrier, SecretPayload::from_parts(message, file))
                .with_password(key.password.clone())
                .with_encryption(key.encrypt())
                .with_options(EmbedOptions {
                    ecc: !no_ecc,
                    container,
                });

            let report = orchestrator.embed(request, &log_progress("embed")).await;
            let result = report.into_result().context("Embed failed")?;
            write_file(&output, result.bytes())?;
            if let EmbedResult::Carrier(carrier) = &result {
                debug!("Service suggested filename {}", carrier.filename);
            }
            println!("Wrote stego carrier to {}", output.display());
        }

        Command::Extract {
            carrier,
            key,
            output_dir,
        } => {
            let request = DecodeRequest::new(read_carrier(&carrier)?)
                .with_password(key.password.clone())
                .with_encryption(key.encrypt());
            let report = orchestrator.extract(request, &log_progress("extract")).await;
            let decoded = report.into_result().context("Extract failed")?;
            print_decoded(&decoded, &output_dir)?;
        }

        Command::EmbedText {
            host_text,
            host_file,
            message,
            key,
            output,
        } => {
            let host = text_source(host_text, host_file)?;
            let request = EncodeRequest::new(CarrierFile::text(host), SecretPayload::Message(message))
                .with_password(key.password.clone())
                .with_encryption(key.encrypt());
            let report = orchestrator.embed(request, &log_progress("embed-text")).await;
            match report.into_result().context("Text embed failed")? {
                EmbedResult::Watermarked(text) => match output {
                    Some(path) => {
                        write_file(&path, text.as_bytes())?;
                        println!("Wrote watermarked text to {}", path.display());
                    }
                    None => println!("{}", text),
                },
                EmbedResult::Carrier(_) => bail!("Service returned a binary carrier for a text embed"),
            }
        }

        Command::ExtractText {
            text,
            text_file,
            key,
        } => {
            let text = text_source(text, text_file)?;
            let request = DecodeRequest::new(CarrierFile::text(text))
                .with_password(key.password.clone())
                .with_encryption(key.encrypt());
            let report = orchestrator.extract(request, &log_progress("extract-text")).await;
            let decoded = report.into_result().context("Text extract failed")?;
            print_decoded(&decoded, Path::new("."))?;
        }

        Command::SelfTest { message, password } => {
            let config = SelfTestConfig {
                message,
                password,
                ..Default::default()
            };
            let report = run_self_test(&orchestrator, &config, &log_progress("self-test"))
                .await
                .context("Self-test failed")?;
            println!(
                "carrier: {} bytes, stego: {} bytes, recovered: {:?}",
                report.carrier_bytes, report.stego_bytes, report.recovered
            );
            if !report.passed {
                bail!(
                    "Self-test mismatch: expected {:?}, got {:?}",
                    report.expected,
                    report.recovered
                );
            }
            println!("Self-test passed");
        }

        Command::SynthWav { .. } | Command::Classify { .. } | Command::Config { .. } => {
            bail!("Command does not use the stego service")
        }
    }

    Ok(())
}

fn run_config(action: ConfigCommand, endpoint: Option<&str>, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigCommand::Init { force } => {
            let path = match path {
                Some(path) => path.to_path_buf(),
                None => default_config_path().context("No platform config directory")?,
            };
            let endpoint = normalize_endpoint(endpoint.unwrap_or(DEFAULT_ENDPOINT))
                .context("Invalid endpoint")?;
            let config = TomlConfig {
                endpoint: Some(endpoint),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                ..Default::default()
            };
            init_toml_config(&config, &path, force)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote config to {}", path.display());
        }
        ConfigCommand::Show => {
            let config =
                ClientConfig::resolve(endpoint, path).context("Failed to resolve configuration")?;
            println!("endpoint:    {}", config.endpoint);
            println!("timeout:     {} s", config.timeout_secs);
            println!("log level:   {}", config.logging.level);
            println!("user agent:  {}", config.user_agent);
        }
    }
    Ok(())
}

fn synth_wav(output: &Path, frequency: f32, duration: f32, sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        bail!("Sample rate must be positive");
    }
    let tone = sine_wave(frequency, duration, sample_rate, 0.5);
    let wav = encode_wav(&[tone], sample_rate);
    write_file(output, wav.as_bytes())?;
    println!(
        "Wrote {} ({} bytes, {} Hz, {:.2} s)",
        output.display(),
        wav.len(),
        frequency,
        duration
    );
    Ok(())
}

/// Read a carrier, sniffing its media type from the content
fn read_carrier(path: &Path) -> Result<CarrierFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read carrier {}", path.display()))?;
    let name = file_name(path);
    let media_type = infer::get(&bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    debug!(
        "Carrier {} sniffed as {} ({:?})",
        name,
        media_type,
        classify(&media_type, &name)
    );
    Ok(CarrierFile::new(bytes, media_type, name))
}

fn read_secret_file(path: &Path) -> Result<SecretFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read secret file {}", path.display()))?;
    let content_type = infer::get(&bytes).map(|t| t.mime_type());
    let file = SecretFile::new(bytes, file_name(path));
    Ok(match content_type {
        Some(content_type) => file.with_content_type(content_type),
        None => file,
    })
}

fn text_source(inline: Option<String>, path: Option<PathBuf>) -> Result<String> {
    match (inline, path) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, None) => bail!("No text given"),
    }
}

fn print_decoded(decoded: &DecodeResult, output_dir: &Path) -> Result<()> {
    if decoded.is_empty() {
        println!("No hidden payload found");
        return Ok(());
    }
    if let Some(message) = &decoded.message {
        println!("Message: {}", message);
    }
    if let Some(file) = &decoded.file {
        let path = output_dir.join(safe_file_name(&file.filename));
        write_file(&path, &file.bytes)?;
        println!("Recovered file: {} ({} bytes)", path.display(), file.bytes.len());
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Last path component of a service-supplied filename
fn safe_file_name(name: &str) -> String {
    match Path::new(name).file_name() {
        Some(n) => n.to_string_lossy().into_owned(),
        None => {
            warn!("Unusable recovered filename {:?}, using default", name);
            stegx_common::payload::DEFAULT_SECRET_FILENAME.to_string()
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
