//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use umbra_core::{IntegratorKind, RenderConfig};

/// Integrator choice on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntegratorArg {
    /// Direct lighting plus recursive specular reflection and refraction
    Direct,
    /// Path tracing with russian roulette
    Path,
}

impl From<IntegratorArg> for IntegratorKind {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::Direct => IntegratorKind::Direct,
            IntegratorArg::Path => IntegratorKind::Path,
        }
    }
}

/// Log levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Render a JSON scene to an image.
///
/// Options given here override the scene file's render settings.
#[derive(Debug, Parser)]
#[command(name = "umbra", version, about = "Offline physically based renderer")]
pub struct Args {
    /// Scene description (JSON)
    pub scene: PathBuf,

    /// Output image; the format follows the extension
    #[arg(short, long, default_value = "out.png")]
    pub output: PathBuf,

    /// Samples per pixel
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub spp: Option<u32>,

    /// Image size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    #[arg(long, value_enum)]
    pub integrator: Option<IntegratorArg>,

    /// Seed mixed into every pixel's random stream
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Args {
    /// Apply the command line overrides to `render`.
    pub fn apply(&self, render: &mut RenderConfig) {
        if let Some(spp) = self.spp {
            render.samples_per_pixel = spp;
        }
        if let Some((width, height)) = self.size {
            render.width = width;
            render.height = height;
        }
        if let Some(integrator) = self.integrator {
            render.integrator = integrator.into();
        }
        if let Some(seed) = self.seed {
            render.seed = seed;
        }
    }
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", text))?;
    let dim = |s: &str| match s.trim().parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(format!("'{}' is not a positive size", s)),
    };
    Ok((dim(w)?, dim(h)?))
}
