// SPDX-License-Identifier: MIT

//! `preper <source-dir> [<output.tgz>|-]`
//!
//! Prepares a package checkout and writes its archive to a file (default
//! `<name>-<version>.tgz` in the current directory) or to stdout for `-`.
//! Configuration is read from the TOML file named by `PREPER_CONFIG`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use futures::StreamExt;
use preper::{
    Config, ConfigError, PackError, PackEvent, PackStream, PackageDescriptor, PackageManifest,
    Preper,
};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum CliError {
    #[error("usage: preper <source-dir> [<output.tgz>|-]")]
    Usage,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("{message}: {source}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot express {} as a file URL", path.display())]
    NotAUrl { path: PathBuf },
}

trait IoContext<T> {
    fn io_context<F>(self, f: F) -> Result<T, CliError>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T, CliError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| CliError::Io {
            message: f(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Stdout,
    File(PathBuf),
    /// `<name>-<version>.tgz` in the current directory.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    source: PathBuf,
    output: Output,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut args = args.into_iter();
        let source = args.next().ok_or(CliError::Usage)?;
        if source == "-h" || source == "--help" {
            return Err(CliError::Usage);
        }
        let output = match args.next().as_deref() {
            None => Output::Default,
            Some("-") => Output::Stdout,
            Some(path) => Output::File(PathBuf::from(path)),
        };
        if args.next().is_some() {
            return Err(CliError::Usage);
        }
        Ok(Self {
            source: PathBuf::from(source),
            output,
        })
    }
}

fn load_config() -> Result<Config, ConfigError> {
    match std::env::var("PREPER_CONFIG") {
        Ok(path) => Config::from_file(Path::new(&path)),
        Err(_) => Ok(Config::default()),
    }
}

fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File name npm would give the archive: `@scope/pkg` becomes `scope-pkg`.
fn output_name(descriptor: &PackageDescriptor) -> String {
    let name = descriptor
        .name
        .strip_prefix('@')
        .unwrap_or(&descriptor.name)
        .replace('/', "-");
    match &descriptor.version {
        Some(version) => format!("{name}-{version}.tgz"),
        None => format!("{name}.tgz"),
    }
}

async fn manifest_for(source: &Path) -> Result<(PackageManifest, PackageDescriptor), CliError> {
    let descriptor = PackageDescriptor::read(source).await?;
    let resolved = url::Url::from_directory_path(source)
        .map_err(|()| CliError::NotAUrl {
            path: source.to_owned(),
        })?
        .to_string();
    Ok((
        PackageManifest::new(descriptor.name.clone(), resolved),
        descriptor,
    ))
}

/// Copy archive bytes from `stream` into `out`.
async fn drain<W: AsyncWrite + Unpin>(
    mut stream: PackStream,
    out: &mut W,
) -> Result<u64, CliError> {
    let mut written = 0u64;
    while let Some(event) = stream.next().await {
        match event? {
            PackEvent::Prepared => info!("prepared"),
            PackEvent::Data(chunk) => {
                out.write_all(&chunk)
                    .await
                    .io_context(|| "Failed to write archive".to_string())?;
                written += chunk.len() as u64;
            }
        }
    }
    out.flush()
        .await
        .io_context(|| "Failed to flush archive".to_string())?;
    Ok(written)
}

/// Stream into a temp file beside `target`, then move it into place.
async fn write_file(stream: PackStream, target: &Path) -> Result<u64, CliError> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let (file, tmp_path) = tempfile::Builder::new()
        .prefix(".preper")
        .suffix(".tgz")
        .tempfile_in(parent)
        .io_context(|| format!("Failed to create temp file in {}", parent.display()))?
        .into_parts();

    let mut file = tokio::fs::File::from_std(file);
    let written = drain(stream, &mut file).await?;
    file.sync_all()
        .await
        .io_context(|| format!("Failed to sync {}", tmp_path.display()))?;
    drop(file);

    tmp_path
        .persist(target)
        .map_err(|e| CliError::Io {
            message: format!("Failed to move archive to {}", target.display()),
            source: e.error,
        })?;
    Ok(written)
}

async fn run(config: &Config, args: Args) -> Result<(), CliError> {
    let source = tokio::fs::canonicalize(&args.source)
        .await
        .io_context(|| format!("Failed to resolve {}", args.source.display()))?;
    let (manifest, descriptor) = manifest_for(&source).await?;
    let preper = Preper::from_config(config)?;
    info!("Packing {manifest}");

    let stream = preper.pack_remote_package(manifest, &source);
    match args.output {
        Output::Stdout => {
            let written = drain(stream, &mut tokio::io::stdout()).await?;
            info!("Wrote {written} bytes to stdout");
        }
        Output::File(target) => {
            let written = write_file(stream, &target).await?;
            info!("Wrote {written} bytes to {}", target.display());
        }
        Output::Default => {
            let target = PathBuf::from(output_name(&descriptor));
            let written = write_file(stream, &target).await?;
            info!("Wrote {written} bytes to {}", target.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("preper: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
