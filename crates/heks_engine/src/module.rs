//! Engine modules.
//!
//! A module is a single stateful extension (keyboard, sprites, renderer...)
//! installed once per engine. On registration its [`Module::init`] hook runs
//! with the engine, which is where it subscribes its event handlers. Handlers
//! reach their module's state again through [`Engine::module`] /
//! [`Engine::module_mut`], keyed by the module's concrete type.

use std::any::Any;

use crate::engine::Engine;
use crate::error::EngineError;

/// A stateful engine extension.
pub trait Module: Any {
    /// Called once, before the module is stored.
    ///
    /// # Errors
    ///
    /// Any error aborts registration.
    fn init(&mut self, _engine: &mut Engine) -> Result<(), EngineError> {
        Ok(())
    }
}
