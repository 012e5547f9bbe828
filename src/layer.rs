use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::blend::BlendMode;
use crate::effects::Effect;
use crate::mask::Mask;
use crate::surface::PixelSurface;

/// An effect entry in a layer's list, toggleable without removing it.
#[derive(Clone, Debug)]
pub struct LayerEffect {
    pub enabled: bool,
    pub effect: Arc<dyn Effect>,
}

impl LayerEffect {
    pub fn new(effect: impl Effect + 'static) -> Self {
        Self {
            enabled: true,
            effect: Arc::new(effect),
        }
    }
}

/// Shared, lock-guarded effect list in UI display order.
///
/// Clones share the same list, so an editor thread can toggle entries while
/// the compositor reads. Readers take a snapshot and release the lock before
/// running anything.
#[derive(Clone, Debug, Default)]
pub struct EffectStack {
    inner: Arc<Mutex<Vec<LayerEffect>>>,
}

impl EffectStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LayerEffect>> {
        // A panicking writer cannot leave a Vec of Arcs half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, effect: LayerEffect) {
        self.lock().push(effect);
    }

    pub fn remove(&self, index: usize) -> Option<LayerEffect> {
        let mut list = self.lock();
        (index < list.len()).then(|| list.remove(index))
    }

    /// Returns false if `index` is out of range.
    pub fn set_enabled(&self, index: usize, enabled: bool) -> bool {
        match self.lock().get_mut(index) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Enabled effects in display order, copied out under the lock.
    pub fn snapshot_enabled(&self) -> Vec<Arc<dyn Effect>> {
        self.lock()
            .iter()
            .filter(|e| e.enabled)
            .map(|e| Arc::clone(&e.effect))
            .collect()
    }
}

/// A compositor input. Owned by the document; the compositor only reads it.
#[derive(Debug)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub opacity: u8,
    pub blend_mode: BlendMode,
    pub mask: Option<Mask>,
    pub effects: EffectStack,
    pub surface: PixelSurface,
}

impl Layer {
    pub fn new(name: impl Into<String>, surface: PixelSurface) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 255,
            blend_mode: BlendMode::Normal,
            mask: None,
            effects: EffectStack::new(),
            surface,
        }
    }

    /// Whether the compositor has anything to draw for this layer.
    pub fn is_drawable(&self) -> bool {
        self.visible && self.opacity > 0
    }
}
