//! `vsl images` — List or remove images.

use clap::Args;
use vessel_runtime::engine::Engine;

use crate::output::{format_age, format_bytes};

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Remove an image by reference instead of listing.
    #[arg(long)]
    pub remove: Option<String>,
}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if catalog operations fail or the removed image is
/// still in use by a container.
pub fn execute(args: ImagesArgs, engine: &Engine) -> anyhow::Result<()> {
    if let Some(reference) = &args.remove {
        let removed = engine
            .remove_image(reference)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{}", removed.id.short());
        return Ok(());
    }

    let images = engine.store().list().map_err(|e| anyhow::anyhow!("{e}"))?;
    if images.is_empty() {
        println!("No images found. Use `vsl import` to add one.");
        return Ok(());
    }

    println!(
        "{:<14} {:<30} {:<8} {:<10} {:<16}",
        "IMAGE ID", "TAGS", "LAYERS", "SIZE", "CREATED"
    );
    for image in &images {
        let layers = engine
            .store()
            .rootfs_chain(image)
            .map(|chain| chain.len().to_string())
            .unwrap_or_else(|_| "?".to_string());
        let tags = if image.tags.is_empty() {
            "<untagged>".to_string()
        } else {
            image.tags.join(",")
        };
        println!(
            "{:<14} {:<30} {:<8} {:<10} {:<16}",
            image.id.short(),
            tags,
            layers,
            format_bytes(image.size_bytes),
            format_age(&image.created_at)
        );
    }
    Ok(())
}
