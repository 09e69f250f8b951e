mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use umbra_core::load_scene;
use umbra_renderer::{build_scene, Renderer};

use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    let mut desc = load_scene(&args.scene)
        .with_context(|| format!("failed to load scene {}", args.scene.display()))?;
    args.apply(&mut desc.render);

    let loaded = build_scene(&desc).context("failed to build scene")?;
    let renderer = Renderer::new(&loaded.scene, &loaded.camera, &loaded.params)?;
    let out = renderer.render();

    let (width, height) = (out.image.width(), out.image.height());
    let image = image::RgbaImage::from_raw(width, height, out.image.to_rgba8())
        .context("image buffer does not match its dimensions")?;
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    log::info!("Wrote {} ({}x{})", args.output.display(), width, height);
    Ok(())
}
