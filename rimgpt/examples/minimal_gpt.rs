// cargo run -p rimgpt --example minimal_gpt -- [reference.img] [output.img]
use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rimgpt::{DiskParams, build_disk, verify_full_disk};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut args = std::env::args_os().skip(1);
    let reference = args.next().map(PathBuf::from);
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("minimal_gpt.img"));

    let params = DiskParams::default();
    let disk = build_disk(&params);
    verify_full_disk(&disk).context("built image failed verification")?;
    info!(bytes = disk.len(), "image built and verified");

    if let Some(path) = reference {
        let expected =
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        if expected.len() != disk.len() {
            bail!(
                "reference is {} bytes, built image is {} bytes",
                expected.len(),
                disk.len()
            );
        }
        if let Some(off) = disk.iter().zip(&expected).position(|(a, b)| a != b) {
            bail!(
                "first difference at offset {off:#x}: built {:#04x}, reference {:#04x}",
                disk[off],
                expected[off]
            );
        }
        info!(reference = %path.display(), "image matches reference");
    }

    std::fs::write(&output, &disk).with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), "image written");
    Ok(())
}
