use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fuser::MountOption;
use tracing_subscriber::EnvFilter;

use skriva::fs::Filesystem;
use skriva::fuse::Fuse;
use skriva::storage::FileStorage;

/// Mounts a skriva image. The session loop runs in the foreground on the
/// calling thread; the core requires operations to arrive one at a time.
#[derive(Parser)]
#[command(name = "skriva", about = "Mount a skriva log-structured filesystem image")]
struct Cli {
    /// Path to the backing image.
    image: PathBuf,
    /// Empty directory to mount on.
    mountpoint: PathBuf,
    /// Allow other users to access the mount.
    #[arg(long)]
    allow_other: bool,
    /// Unmount automatically when the process exits.
    #[arg(long)]
    auto_unmount: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let storage = FileStorage::open(&cli.image)
        .with_context(|| format!("failed to open image {}", cli.image.display()))?;
    let fs = Filesystem::mount(storage)
        .with_context(|| format!("failed to mount image {}", cli.image.display()))?;

    let mut options = vec![
        MountOption::FSName("skriva".to_owned()),
        MountOption::DefaultPermissions,
    ];
    if cli.allow_other {
        options.push(MountOption::AllowOther);
    }
    if cli.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }

    fuser::mount2(Fuse::new(fs), &cli.mountpoint, &options)
        .with_context(|| format!("failed to serve {}", cli.mountpoint.display()))?;
    Ok(())
}
