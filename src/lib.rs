//! Raster compositing and stroke-painting core for a pixel-art editor.
//!
//! Pixels are stored as BGRA bytes (row-major, no padding) and handled as
//! packed `0xAARRGGBB` values with straight alpha. Painters mutate a
//! [`PixelSurface`] and hand back a change record for the host's undo stack;
//! the [`Compositor`] flattens a layer list into a destination surface.
//!
//! Everything runs synchronously on the calling thread.

#![allow(clippy::too_many_arguments)]

pub mod blend;
pub mod brush;
pub mod cli;
pub mod color;
pub mod compositor;
pub mod context;
pub mod dither;
pub mod effects;
pub mod error;
pub mod flood_fill;
pub mod gradient;
pub mod gradient_cycle;
pub mod history;
pub mod layer;
pub mod logger;
pub mod mask;
pub mod settings;
pub mod stroke;
pub mod surface;

pub use blend::BlendMode;
pub use brush::{BrushMode, BrushSettings, BrushShape, CustomBrush};
pub use compositor::Compositor;
pub use context::StrokeContext;
pub use dither::DitherStyle;
pub use effects::{BrightnessContrast, Effect, Grayscale, Invert, Sepia, Tint};
pub use error::{ConfigError, PaintError, SurfaceError};
pub use flood_fill::{FillMode, FillSettings, FloodFiller, flood_fill};
pub use gradient::{ColorStop, GradientSettings, GradientShape, render_gradient};
pub use gradient_cycle::{CycleSettings, GradientCyclePainter};
pub use history::{HistoryItem, PixelChange, PixelChangeResult, SnapshotDiff};
pub use layer::{EffectStack, Layer, LayerEffect};
pub use mask::{Mask, Selection};
pub use settings::ToolSettings;
pub use stroke::{AccumRec, BrushPainter, StrokeAccumulator};
pub use surface::{ListenerId, PixelSurface, SurfaceId};
