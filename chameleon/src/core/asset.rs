//! Opaque engine handles and staged assets.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An opaque, shareable engine-side object (renderer, scene, camera, ...).
pub type Handle = Arc<dyn Any + Send + Sync>;

/// The mount target a pipeline renders into. Opaque to the core.
pub type MountTarget = Handle;

/// Wraps any value as a [`Handle`].
pub fn handle<T: Any + Send + Sync>(value: T) -> Handle {
    Arc::new(value)
}

/// A loaded or parsed resource.
#[derive(Clone)]
pub enum Asset {
    /// A JSON document, e.g. glTF.
    Json(serde_json::Value),
    /// Raw bytes, e.g. GLB.
    Binary(Vec<u8>),
    /// An engine-native object produced by the adapter.
    Native(Handle),
}

impl Asset {
    /// Returns the JSON document, if any.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the bytes, if any.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Downcasts a native asset to a concrete engine type.
    #[must_use]
    pub fn native<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Native(handle) => Arc::clone(handle).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Binary(bytes) => write!(f, "Binary({} bytes)", bytes.len()),
            Self::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// Engine objects created by `initEngine`.
///
/// `engine`, `scene` and `camera` are the recognized keys; adapters that expose
/// more (controls, pickers, ...) put them in `extras`.
#[derive(Clone, Default)]
pub struct EngineHandles {
    /// The renderer / runtime.
    pub engine: Option<Handle>,
    /// The scene root.
    pub scene: Option<Handle>,
    /// The active camera.
    pub camera: Option<Handle>,
    /// Adapter-specific handles.
    pub extras: HashMap<String, Handle>,
}

impl EngineHandles {
    /// Creates handles with engine, scene and camera set.
    #[must_use]
    pub fn new(engine: Handle, scene: Handle, camera: Handle) -> Self {
        Self {
            engine: Some(engine),
            scene: Some(scene),
            camera: Some(camera),
            extras: HashMap::new(),
        }
    }

    /// Adds an adapter-specific handle.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Handle) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Returns true once an engine handle is present.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Downcasts the engine handle.
    #[must_use]
    pub fn engine_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        downcast(self.engine.as_ref())
    }

    /// Downcasts the scene handle.
    #[must_use]
    pub fn scene_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        downcast(self.scene.as_ref())
    }

    /// Downcasts the camera handle.
    #[must_use]
    pub fn camera_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        downcast(self.camera.as_ref())
    }

    /// Downcasts an extra handle.
    #[must_use]
    pub fn extra_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        downcast(self.extras.get(key))
    }
}

fn downcast<T: Any + Send + Sync>(handle: Option<&Handle>) -> Option<Arc<T>> {
    handle.and_then(|h| Arc::clone(h).downcast::<T>().ok())
}

impl fmt::Debug for EngineHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extras: Vec<&String> = self.extras.keys().collect();
        extras.sort();
        f.debug_struct("EngineHandles")
            .field("has_engine", &self.engine.is_some())
            .field("has_scene", &self.scene.is_some())
            .field("has_camera", &self.camera.is_some())
            .field("extras", &extras)
            .finish()
    }
}
