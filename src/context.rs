use std::fmt;

use uuid::Uuid;

use crate::brush::{BrushSettings, CustomBrush};
use crate::mask::{self, Selection};
use crate::surface::{PixelSurface, SurfaceId};

type AlphaFn<'a> = Box<dyn Fn(i32, i32) -> u8 + 'a>;

/// Read-only view of everything a painter needs for one stroke.
///
/// Built fresh by the tool layer for each stroke; painters never mutate it.
pub struct StrokeContext<'a> {
    pub surface: SurfaceId,
    pub foreground: u32,
    pub background: u32,
    pub settings: BrushSettings,
    pub offsets: Vec<(i32, i32)>,
    alpha: AlphaFn<'a>,
    pub selection: Option<&'a dyn Selection>,
    pub snapshot: Option<&'a [u8]>,
    pub custom_brush: Option<Uuid>,
}

impl<'a> StrokeContext<'a> {
    /// Context for a procedural brush described by `settings`.
    pub fn new(surface: &PixelSurface, foreground: u32, settings: BrushSettings) -> Self {
        let offsets = settings.footprint();
        let alpha_settings = settings.clone();
        Self {
            surface: surface.id(),
            foreground,
            background: 0xFFFF_FFFF,
            settings,
            offsets,
            alpha: Box::new(move |dx, dy| alpha_settings.alpha_at(dx, dy)),
            selection: None,
            snapshot: None,
            custom_brush: None,
        }
    }

    /// Use an image tip instead of the procedural footprint.
    pub fn with_custom_brush(mut self, brush: &'a CustomBrush) -> Self {
        let (density, opacity) = (self.settings.density, self.settings.opacity);
        self.offsets = brush.offsets();
        self.alpha = Box::new(move |dx, dy| brush.alpha_at(dx, dy, density, opacity));
        self.custom_brush = Some(brush.id());
        self
    }

    /// Use an explicit footprint and alpha function.
    pub fn with_footprint(
        mut self,
        offsets: Vec<(i32, i32)>,
        alpha: impl Fn(i32, i32) -> u8 + 'a,
    ) -> Self {
        self.offsets = offsets;
        self.alpha = Box::new(alpha);
        self
    }

    pub fn with_selection(mut self, selection: &'a dyn Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Pre-stroke pixels to take `before` values from instead of the live surface.
    pub fn with_snapshot(mut self, snapshot: &'a [u8]) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_background(mut self, background: u32) -> Self {
        self.background = background;
        self
    }

    #[inline]
    pub fn alpha_at(&self, dx: i32, dy: i32) -> u8 {
        (self.alpha)(dx, dy)
    }

    #[inline]
    pub fn is_selected(&self, x: i32, y: i32) -> bool {
        mask::selected(self.selection, x, y)
    }

    pub fn is_hard_opaque(&self) -> bool {
        self.settings.is_hard_opaque()
    }
}

impl fmt::Debug for StrokeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrokeContext")
            .field("surface", &self.surface)
            .field("foreground", &format_args!("{:#010X}", self.foreground))
            .field("settings", &self.settings)
            .field("offsets", &self.offsets.len())
            .field("has_selection", &self.selection.is_some())
            .field("has_snapshot", &self.snapshot.is_some())
            .field("custom_brush", &self.custom_brush)
            .finish()
    }
}
