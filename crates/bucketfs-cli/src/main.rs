use std::io::Write;
use std::path::PathBuf;

use bucketfs_common::time::format_listing_time;
use bucketfs_core::{BucketFileSystem, FileStatus, FsConfig, FsPath};
use bucketfs_storage::credentials::StaticCredentialProvider;
use bucketfs_storage::disk::DiskConnector;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bucketfs", about = "Hierarchical file access to an object-store container")]
struct Cli {
    /// Container to operate on, as `bucketfs://container`.
    #[arg(long, default_value = "bucketfs://default")]
    uri: String,

    /// Directory holding the local object store.
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// JSON configuration file; `BUCKETFS_*` variables are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the working directory.
    Pwd,
    /// Show the status of a path.
    Stat { path: String },
    /// List the children of a directory.
    Ls { path: Option<String> },
    /// Create a directory and any missing parents.
    Mkdir { path: String },
    /// Upload a local file.
    Put {
        local: PathBuf,
        path: String,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Write a file's contents to stdout.
    Cat { path: String },
    /// Move a file or directory.
    Mv { src: String, dst: String },
    /// Delete a file or directory.
    Rm {
        path: String,
        #[arg(short, long, default_value_t = false)]
        recursive: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("bucketfs_core=info".parse()?)
        .add_directive("bucketfs_storage=info".parse()?)
        .add_directive("bucketfs_cli=info".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FsConfig::from_json(&tokio::fs::read_to_string(path).await?)?,
        None => FsConfig::from_env()?,
    };

    let provider = StaticCredentialProvider::default().with_account(config.credentials());
    let connector = DiskConnector::new(PathBuf::from(&cli.data_dir), provider);
    let fs = BucketFileSystem::initialize(&cli.uri, &config, &connector).await?;

    match cli.command {
        Command::Pwd => println!("{}", fs.working_directory()),
        Command::Stat { path } => print_status(&fs.status(&path.parse::<FsPath>()?).await?),
        Command::Ls { path } => {
            let target = path.as_deref().unwrap_or(".").parse::<FsPath>()?;
            for status in fs.list_status(&target).await? {
                print_status(&status);
            }
        }
        Command::Mkdir { path } => {
            fs.mkdirs(&path.parse::<FsPath>()?).await?;
        }
        Command::Put {
            local,
            path,
            overwrite,
        } => {
            let data = tokio::fs::read(&local).await?;
            let mut writer = fs.create(&path.parse::<FsPath>()?, overwrite).await?;
            writer.write_all(&data)?;
            let status = writer.close().await?;
            info!(path = %status.path, size = status.length, "uploaded");
        }
        Command::Cat { path } => {
            let data = fs.open(&path.parse::<FsPath>()?).await?;
            std::io::stdout().write_all(&data)?;
        }
        Command::Mv { src, dst } => {
            if !fs.rename(&src.parse::<FsPath>()?, &dst.parse::<FsPath>()?).await? {
                warn!(src = %src, dst = %dst, "rename refused");
                std::process::exit(1);
            }
        }
        Command::Rm { path, recursive } => {
            if !fs.delete(&path.parse::<FsPath>()?, recursive).await? {
                warn!(path = %path, "delete failed");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_status(status: &FileStatus) {
    let kind = if status.is_directory { 'd' } else { '-' };
    println!(
        "{kind} {:>8} {:>12} {} {}",
        status.owner,
        status.length,
        format_listing_time(&status.modification_time),
        status.path
    );
}
