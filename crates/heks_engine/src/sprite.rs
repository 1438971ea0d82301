//! Sprites, sprite sheets and the image cache.
//!
//! A [`Sprite`] is a named list of frames cut from one image file. Entities
//! refer to sprites by id through a [`SpriteComponent`] stored as JSON under
//! the [`SPRITE_COMPONENT`] name, so the component survives snapshots and
//! filters like any other value.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use heks_math::{Offset, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::EngineError;
use crate::module::Module;

/// Component name under which [`SpriteComponent`]s are stored.
pub const SPRITE_COMPONENT: &str = "sprite";

/// One frame: a rectangle of the sprite's image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteFrame {
    pub size: Size,
    pub offset: Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub id: String,
    /// Path of the image the frames are cut from.
    pub file: String,
    pub frames: Vec<SpriteFrame>,
    /// Drawing offset applied to the entity position.
    pub origin: Offset,
}

/// A single-row sprite sheet description, as found in sprite atlases.
///
/// Atlas keys not listed here (such as `frameTotal`) are ignored; `frames`
/// alone decides which columns become sprite frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteSheet {
    pub name: String,
    pub file: String,
    pub frame_size: Size,
    /// Column of the sheet's first frame.
    #[serde(default)]
    pub frame_start: u32,
    /// Frame indices, relative to `frame_start`.
    pub frames: Vec<u32>,
    #[serde(default)]
    pub origin: Offset,
}

impl SpriteSheet {
    /// Cut the frames out of the sheet. All frames are on row 0.
    #[must_use]
    pub fn frames(&self) -> Vec<SpriteFrame> {
        self.frames
            .iter()
            .map(|index| {
                let column = (index + self.frame_start) as f32;
                SpriteFrame {
                    size: self.frame_size,
                    offset: Offset::new(0.0, column * self.frame_size.width),
                }
            })
            .collect()
    }
}

/// Per-entity sprite state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteComponent {
    pub id: String,
    pub frame: usize,
    pub frames_per_second: f64,
    pub is_animating: bool,
    pub is_looping: bool,
    /// Time (ms) the current animation started; set on the first animated
    /// frame and cleared when animation stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_start: Option<f64>,
}

impl SpriteComponent {
    /// Serialize into a component value.
    ///
    /// # Errors
    ///
    /// Fails only if a float field is not finite.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// The sprite registry module.
#[derive(Debug, Default)]
pub struct SpriteManager {
    sprites: HashMap<String, Sprite>,
}

impl Module for SpriteManager {}

impl SpriteManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a sprite. `origin` defaults to `{top: 0, left: 0}`.
    pub fn create_sprite(
        &mut self,
        id: impl Into<String>,
        file: impl Into<String>,
        frames: Vec<SpriteFrame>,
        origin: Option<Offset>,
    ) -> &Sprite {
        let sprite = Sprite {
            id: id.into(),
            file: file.into(),
            frames,
            origin: origin.unwrap_or(Offset::ZERO),
        };
        debug!(sprite = %sprite.id, frames = sprite.frames.len(), "created sprite");
        match self.sprites.entry(sprite.id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(sprite);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(sprite),
        }
    }

    /// Register a sprite named after the sheet.
    pub fn create_sprite_from_sheet(&mut self, sheet: &SpriteSheet) -> &Sprite {
        self.create_sprite(
            sheet.name.clone(),
            sheet.file.clone(),
            sheet.frames(),
            Some(sheet.origin),
        )
    }

    /// Register every sheet of an atlas.
    pub fn load_sprite_atlas<'a>(&mut self, sheets: impl IntoIterator<Item = &'a SpriteSheet>) {
        for sheet in sheets {
            self.create_sprite_from_sheet(sheet);
        }
    }

    /// Parse a JSON array of sheets and register them.
    ///
    /// # Errors
    ///
    /// Returns the parse error; nothing is registered in that case.
    pub fn load_sprite_atlas_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let sheets: Vec<SpriteSheet> = serde_json::from_str(json)?;
        self.load_sprite_atlas(&sheets);
        Ok(sheets.len())
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSprite`] if `id` is not registered.
    pub fn get_sprite(&self, id: &str) -> Result<&Sprite, EngineError> {
        self.sprites
            .get(id)
            .ok_or_else(|| EngineError::UnknownSprite(id.to_string()))
    }

    /// Returns whether a sprite named `id` is registered.
    #[must_use]
    pub fn has_sprite(&self, id: &str) -> bool {
        self.sprites.contains_key(id)
    }

    /// A fresh component pointing at sprite `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSprite`] if `id` is not registered.
    pub fn component_for_sprite(
        &self,
        id: &str,
        frames_per_second: f64,
        is_animating: bool,
        is_looping: bool,
        start_frame: usize,
    ) -> Result<SpriteComponent, EngineError> {
        let sprite = self.get_sprite(id)?;
        Ok(SpriteComponent {
            id: sprite.id.clone(),
            frame: start_frame,
            frames_per_second,
            is_animating,
            is_looping,
            animation_start: None,
        })
    }
}

/// Images keyed by file path, loaded on first use.
#[derive(Debug)]
pub struct ImageCache<I> {
    images: HashMap<String, I>,
}

impl<I> ImageCache<I> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
        }
    }

    /// Return the cached image for `path`, loading it first if needed (or
    /// always, when `use_cache` is false).
    ///
    /// # Errors
    ///
    /// Returns the loader's error; the cache is left unchanged.
    pub fn get_or_load<E>(
        &mut self,
        path: &str,
        use_cache: bool,
        load: impl FnOnce(&str) -> Result<I, E>,
    ) -> Result<&I, E> {
        match self.images.entry(path.to_string()) {
            Entry::Occupied(mut entry) => {
                if !use_cache {
                    entry.insert(load(path)?);
                }
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(load(path)?)),
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&I> {
        self.images.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self::new()
    }
}
