//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage names and hook composition kinds
//! - Render requests and their sources
//! - Opaque engine handles and staged assets

mod asset;
mod request;
mod stage;

pub use asset::{handle, Asset, EngineHandles, Handle, MountTarget};
pub use request::{RenderRequest, Source};
pub use stage::{HookKind, Stage};
