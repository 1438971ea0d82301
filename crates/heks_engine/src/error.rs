//! Engine-level error types.

use heks_component::ComponentError;

use crate::room::{RoomId, ViewportId};

/// Errors raised by the engine facade.
///
/// All of these are returned at the point of detection; the engine never
/// retries or recovers internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Entity, component or filter error from the world.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// The room id is not registered.
    #[error("can't find room with id \"{0}\"")]
    UnknownRoom(RoomId),

    /// The viewport id is not registered.
    #[error("no viewport with id {0} found")]
    UnknownViewport(ViewportId),

    /// A viewport with this id is already registered.
    #[error("viewport with id {0} already exists")]
    ViewportAlreadyExists(ViewportId),

    /// The viewport is already attached to another room.
    #[error("viewport {viewport} already belongs to room \"{room}\"")]
    ViewportInOtherRoom { viewport: ViewportId, room: RoomId },

    /// An operation scoped to the current room ran with no current room set.
    #[error("there is no current room set")]
    NoCurrentRoom,

    /// A module of the same type is already installed.
    #[error("module {0} is already registered")]
    ModuleAlreadyRegistered(&'static str),

    /// A sprite id was referenced that the sprite manager does not know.
    #[error("sprite with id {0} doesn't exist")]
    UnknownSprite(String),
}
