//! Command line and environment settings.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::loaders::{DEFAULT_MODEL_DIR, DEFAULT_MODEL_PREFIX};
use crate::pipelines::utils::DeviceRequest;

/// Sentiment analysis server backed by a BERT classifier stored in S3
#[derive(Parser, Debug)]
#[command(name = "sentiment-serve")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Settings for the default `serve` mode
    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the model and serve predictions over HTTP (default)
    Serve(ServeArgs),
    /// Upload a local model directory to the bucket
    Upload(UploadArgs),
}

impl Cli {
    /// The subcommand to run, falling back to `serve` with the top-level flags.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Bucket holding the model artifact
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket_name: Option<String>,

    /// Local cache directory for the model files
    #[arg(long, env = "MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,

    /// Key prefix of the model inside the bucket
    #[arg(long, env = "MODEL_PREFIX", default_value = DEFAULT_MODEL_PREFIX)]
    pub model_prefix: String,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Compute device: auto, cpu, cuda[:N] or metal[:N]
    #[arg(long, env = "DEVICE", default_value = "auto", value_parser = parse_device)]
    pub device: DeviceRequest,
}

impl ServeArgs {
    /// Settings with every default applied and the given bucket.
    pub fn with_bucket(bucket_name: Option<String>) -> Self {
        Self {
            bucket_name,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            model_prefix: DEFAULT_MODEL_PREFIX.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            device: DeviceRequest::Auto,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Destination bucket (must already exist)
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket_name: Option<String>,

    /// Local directory with the trained model
    #[arg(long, default_value = "tinybert-sentiment-analysis")]
    pub source_dir: PathBuf,

    /// Key prefix to upload under
    #[arg(long, env = "MODEL_PREFIX", default_value = DEFAULT_MODEL_PREFIX)]
    pub model_prefix: String,
}

fn parse_device(s: &str) -> Result<DeviceRequest, String> {
    s.parse().map_err(|e: crate::error::ServeError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from([
            "sentiment-serve",
            "--bucket-name",
            "models",
            "--port",
            "9000",
            "--device",
            "cpu",
        ]);
        match cli.into_command() {
            Command::Serve(args) => {
                assert_eq!(args.bucket_name.as_deref(), Some("models"));
                assert_eq!(args.port, 9000);
                assert_eq!(args.device, DeviceRequest::Cpu);
                assert_eq!(args.model_prefix, DEFAULT_MODEL_PREFIX);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn upload_subcommand_parses() {
        let cli = Cli::parse_from([
            "sentiment-serve",
            "upload",
            "--bucket-name",
            "models",
            "--source-dir",
            "out/tinybert",
        ]);
        match cli.into_command() {
            Command::Upload(args) => {
                assert_eq!(args.source_dir, PathBuf::from("out/tinybert"));
                assert_eq!(args.model_prefix, DEFAULT_MODEL_PREFIX);
            }
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_device() {
        let parsed = Cli::try_parse_from(["sentiment-serve", "--device", "tpu"]);
        assert!(parsed.is_err());
    }
}
