use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use skriva::block::BLOCK_SIZE;
use skriva::fs::Filesystem;
use skriva::storage::FileStorage;

#[derive(Parser)]
#[command(name = "mkfs.skriva", about = "Create a skriva filesystem image")]
struct Cli {
    /// Path of the image to create.
    image: PathBuf,
    /// Image size in 4 KiB blocks.
    #[arg(long, default_value_t = 1024)]
    blocks: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&cli.image)
        .with_context(|| format!("failed to create image {}", cli.image.display()))?;
    file.set_len(u64::from(cli.blocks) * BLOCK_SIZE as u64)
        .context("failed to size the image")?;
    drop(file);

    let storage = FileStorage::open(&cli.image)
        .with_context(|| format!("failed to open image {}", cli.image.display()))?;
    let fs = Filesystem::format(storage)
        .with_context(|| format!("failed to format image {}", cli.image.display()))?;

    eprintln!(
        "mkfs.skriva: created filesystem on {} with {} blocks, log tail at {}",
        cli.image.display(),
        fs.superblock().total_blocks.get(),
        fs.log_tail(),
    );
    Ok(())
}
