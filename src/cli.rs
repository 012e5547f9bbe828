// ============================================================================
// paintcore CLI — headless fill / gradient / flatten on PNG files
// ============================================================================
//
// Usage examples:
//   paintcore fill -i sprite.png -o out.png --at 4,7 --color ff0000 --tolerance 16
//   paintcore gradient -i sky.png -o out.png --from 0,0 --to 0,64 --dither bayer4
//   paintcore gradient --size 128x32 -o ramp.png --from 0,0 --to 128,0 --stops ffffff,2040ff
//   paintcore flatten -o flat.png base.png shade.png:multiply:180
//
// All processing runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::blend::BlendMode;
use crate::color;
use crate::compositor::Compositor;
use crate::dither::DitherStyle;
use crate::error::{ConfigError, SurfaceError};
use crate::flood_fill::{FillMode, FloodFiller};
use crate::gradient::{self, ColorStop, GradientShape};
use crate::layer::Layer;
use crate::settings::ToolSettings;
use crate::surface::PixelSurface;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// paintcore headless raster processor.
#[derive(Parser, Debug)]
#[command(
    name = "paintcore",
    version,
    about = "Headless flood fill, gradient fill and layer flattening for PNG files"
)]
pub struct CliArgs {
    /// Tool settings JSON; command-line flags override its values.
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Flood fill from a seed pixel.
    Fill {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Seed pixel as X,Y.
        #[arg(long, value_parser = parse_point_i32)]
        at: (i32, i32),
        /// Fill color, RRGGBB or AARRGGBB.
        #[arg(long, value_parser = parse_color)]
        color: u32,
        /// 0..255 per-channel tolerance.
        #[arg(long)]
        tolerance: Option<u8>,
        /// Recolor every matching pixel, not just the connected region.
        #[arg(long)]
        global: bool,
    },

    /// Render a gradient over an image (or a fresh transparent canvas).
    Gradient {
        #[arg(short, long, conflicts_with = "size")]
        input: Option<PathBuf>,
        /// Canvas size WxH when no input is given.
        #[arg(long, value_parser = parse_size)]
        size: Option<(i32, i32)>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_point_f32)]
        from: (f32, f32),
        #[arg(long, value_parser = parse_point_f32)]
        to: (f32, f32),
        /// linear, radial, angular, diamond
        #[arg(long, value_parser = parse_shape)]
        shape: Option<GradientShape>,
        /// none, bayer2, bayer4, bayer8, floyd_steinberg, atkinson, riemersma
        #[arg(long, value_parser = parse_dither)]
        dither: Option<DitherStyle>,
        /// Comma-separated colors, spaced evenly from start to end.
        #[arg(long, value_delimiter = ',', value_parser = parse_color)]
        stops: Vec<u32>,
        #[arg(long)]
        reverse: bool,
        #[arg(long)]
        opacity: Option<u8>,
    },

    /// Composite layers bottom to top into one image.
    Flatten {
        #[arg(short, long)]
        output: PathBuf,
        /// Layers as PATH[:MODE[:OPACITY]], bottom first.
        #[arg(required = true, num_args = 1.., value_parser = parse_layer_spec)]
        layers: Vec<LayerSpec>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    pub path: PathBuf,
    pub mode: BlendMode,
    pub opacity: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Usage(String),
}

// ============================================================================
// Value parsers
// ============================================================================

fn split_pair(s: &str, sep: char) -> Result<(&str, &str), String> {
    s.split_once(sep)
        .ok_or_else(|| format!("expected two values separated by '{sep}', got '{s}'"))
}

fn parse_point_i32(s: &str) -> Result<(i32, i32), String> {
    let (a, b) = split_pair(s, ',')?;
    let x = a.trim().parse().map_err(|e| format!("bad x '{a}': {e}"))?;
    let y = b.trim().parse().map_err(|e| format!("bad y '{b}': {e}"))?;
    Ok((x, y))
}

fn parse_point_f32(s: &str) -> Result<(f32, f32), String> {
    let (a, b) = split_pair(s, ',')?;
    let x = a.trim().parse().map_err(|e| format!("bad x '{a}': {e}"))?;
    let y = b.trim().parse().map_err(|e| format!("bad y '{b}': {e}"))?;
    Ok((x, y))
}

fn parse_size(s: &str) -> Result<(i32, i32), String> {
    let lower = s.to_lowercase();
    let (a, b) = split_pair(&lower, 'x')?;
    let w = a.trim().parse().map_err(|e| format!("bad width '{a}': {e}"))?;
    let h = b.trim().parse().map_err(|e| format!("bad height '{b}': {e}"))?;
    Ok((w, h))
}

fn parse_color(s: &str) -> Result<u32, String> {
    color::parse_hex(s.trim()).ok_or_else(|| format!("'{s}' is not RRGGBB or AARRGGBB hex"))
}

fn parse_shape(s: &str) -> Result<GradientShape, String> {
    GradientShape::all()
        .iter()
        .copied()
        .find(|shape| shape.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown gradient shape '{s}'"))
}

fn parse_dither(s: &str) -> Result<DitherStyle, String> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "none" => Ok(DitherStyle::None),
        "bayer2" => Ok(DitherStyle::Bayer2),
        "bayer4" => Ok(DitherStyle::Bayer4),
        "bayer8" => Ok(DitherStyle::Bayer8),
        "floyd_steinberg" | "fs" => Ok(DitherStyle::FloydSteinberg),
        "atkinson" => Ok(DitherStyle::Atkinson),
        "riemersma" => Ok(DitherStyle::Riemersma),
        _ => Err(format!("unknown dither style '{s}'")),
    }
}

fn parse_blend_mode(s: &str) -> Result<BlendMode, String> {
    let wanted = s.replace(['_', '-', ' '], "");
    BlendMode::all()
        .iter()
        .copied()
        .find(|m| m.name().replace(' ', "").eq_ignore_ascii_case(&wanted))
        .ok_or_else(|| format!("unknown blend mode '{s}'"))
}

fn parse_layer_spec(s: &str) -> Result<LayerSpec, String> {
    let mut parts = s.splitn(3, ':');
    let path = parts.next().unwrap_or_default();
    if path.is_empty() {
        return Err("empty layer path".to_string());
    }
    let mode = match parts.next() {
        Some(m) => parse_blend_mode(m)?,
        None => BlendMode::Normal,
    };
    let opacity = match parts.next() {
        Some(o) => o.parse().map_err(|e| format!("bad opacity '{o}': {e}"))?,
        None => 255,
    };
    Ok(LayerSpec {
        path: PathBuf::from(path),
        mode,
        opacity,
    })
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one subcommand and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let start = Instant::now();
    match execute(args) {
        Ok(()) => {
            info!(elapsed_ms = start.elapsed().as_millis() as u64, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(args: CliArgs) -> Result<(), CliError> {
    let mut settings = match &args.settings {
        Some(path) => ToolSettings::load(path)?,
        None => ToolSettings::default(),
    };

    match args.command {
        Command::Fill {
            input,
            output,
            at,
            color,
            tolerance,
            global,
        } => {
            if let Some(t) = tolerance {
                settings.fill.tolerance = t;
            }
            if global {
                settings.fill.mode = FillMode::Global;
            }
            let mut surface = load_surface(&input)?;
            let result = FloodFiller::new().fill(&mut surface, at.0, at.1, color, &settings.fill, None);
            match result {
                Some(r) => println!("{}: {} pixel(s) changed", output.display(), r.len()),
                None => println!("{}: nothing to fill", output.display()),
            }
            save_surface(&surface, &output)
        }

        Command::Gradient {
            input,
            size,
            output,
            from,
            to,
            shape,
            dither,
            stops,
            reverse,
            opacity,
        } => {
            let g = &mut settings.gradient;
            if let Some(shape) = shape {
                g.shape = shape;
            }
            if let Some(dither) = dither {
                g.dither = dither;
            }
            if !stops.is_empty() {
                g.stops = even_stops(&stops);
            }
            g.reverse |= reverse;
            if let Some(o) = opacity {
                g.opacity = o;
            }

            let mut surface = match (input, size) {
                (Some(path), _) => load_surface(&path)?,
                (None, Some((w, h))) => PixelSurface::new(w, h)?,
                (None, None) => return Err(CliError::Usage("gradient needs --input or --size".to_string())),
            };
            gradient::render_gradient(&mut surface, from, to, &settings.gradient, None);
            save_surface(&surface, &output)
        }

        Command::Flatten { output, layers } => {
            let mut stack = Vec::with_capacity(layers.len());
            for entry in &layers {
                let surface = load_surface(&entry.path)?;
                let name = entry
                    .path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut layer = Layer::new(name, surface);
                layer.blend_mode = entry.mode;
                layer.opacity = entry.opacity;
                stack.push(layer);
            }
            let (w, h) = stack
                .first()
                .map(|l| (l.surface.width(), l.surface.height()))
                .ok_or_else(|| CliError::Usage("no layers given".to_string()))?;
            let mut dest = PixelSurface::new(w, h)?;
            Compositor::new().composite_linear(&stack, &mut dest);
            save_surface(&dest, &output)
        }
    }
}

fn even_stops(colors: &[u32]) -> Vec<ColorStop> {
    let last = colors.len().saturating_sub(1).max(1) as f32;
    colors
        .iter()
        .enumerate()
        .map(|(i, &c)| ColorStop::new(i as f32 / last, c))
        .collect()
}

fn load_surface(path: &Path) -> Result<PixelSurface, CliError> {
    let img = image::open(path)
        .map_err(|source| CliError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgba8();
    Ok(PixelSurface::from_rgba_image(&img)?)
}

fn save_surface(surface: &PixelSurface, path: &Path) -> Result<(), CliError> {
    surface
        .to_rgba_image()
        .save(path)
        .map_err(|source| CliError::Image {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layer_spec() {
        let entry = parse_layer_spec("shade.png:hard-light:180").unwrap();
        assert_eq!(entry.path, PathBuf::from("shade.png"));
        assert_eq!(entry.mode, BlendMode::HardLight);
        assert_eq!(entry.opacity, 180);

        let plain = parse_layer_spec("base.png").unwrap();
        assert_eq!((plain.mode, plain.opacity), (BlendMode::Normal, 255));
        assert!(parse_layer_spec("x.png:glow").is_err());
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_point_i32("4, 7"), Ok((4, 7)));
        assert_eq!(parse_size("128X32"), Ok((128, 32)));
        assert_eq!(parse_color("#ff0000"), Ok(0xFFFF_0000));
        assert_eq!(parse_shape("Diamond"), Ok(GradientShape::Diamond));
        assert_eq!(parse_dither("floyd-steinberg"), Ok(DitherStyle::FloydSteinberg));
        assert!(parse_point_f32("1.5").is_err());
    }

    #[test]
    fn test_even_stops() {
        let stops = even_stops(&[1, 2, 3]);
        let pos: Vec<f32> = stops.iter().map(|s| s.position).collect();
        assert_eq!(pos, [0.0, 0.5, 1.0]);
        assert_eq!(even_stops(&[7])[0].position, 0.0);
    }

    #[test]
    fn test_args_parse() {
        let args = CliArgs::try_parse_from([
            "paintcore", "-vv", "fill", "-i", "a.png", "-o", "b.png", "--at", "1,2", "--color", "00ff00",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Fill { at: (1, 2), color: 0xFF00_FF00, .. }));
    }

    #[test]
    fn test_fill_and_flatten_round_trip_through_png() {
        let dir = std::env::temp_dir().join(format!("paintcore-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("base.png");
        let filled = dir.join("filled.png");
        let flat = dir.join("flat.png");

        save_surface(&PixelSurface::new(4, 4).unwrap(), &base).unwrap();
        execute(CliArgs {
            settings: None,
            verbose: 0,
            command: Command::Fill {
                input: base.clone(),
                output: filled.clone(),
                at: (0, 0),
                color: 0xFF00_00FF,
                tolerance: None,
                global: false,
            },
        })
        .unwrap();
        execute(CliArgs {
            settings: None,
            verbose: 0,
            command: Command::Flatten {
                output: flat.clone(),
                layers: vec![LayerSpec {
                    path: filled,
                    mode: BlendMode::Normal,
                    opacity: 255,
                }],
            },
        })
        .unwrap();

        let out = load_surface(&flat).unwrap();
        assert_eq!(out.read_bgra(3, 3), 0xFF00_00FF);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
