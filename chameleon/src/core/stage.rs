//! Stage names and hook composition kinds.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named phase of the rendering lifecycle.
///
/// The string form (`Display`, `FromStr`, serde) is the camelCase name plugins
/// and tooling use on the wire, e.g. `"resourceLoad"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Create the engine runtime, scene and camera.
    InitEngine,
    /// Load raw resources (models, textures).
    ResourceLoad,
    /// Parse and validate loaded resources.
    ResourceParse,
    /// Build the scene graph from parsed resources.
    BuildScene,
    /// Per-frame work; set up once, then driven by the adapter.
    RenderLoop,
    /// Post-processing after the render loop is running.
    PostProcess,
    /// Teardown. Never part of the executed sequence.
    Dispose,
}

/// How the taps of a stage hook are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Sequential, every tap runs, no value threading.
    Series,
    /// Sequential, a tap may replace the value handed to the next one.
    Waterfall,
    /// Sequential, stops at the first tap that produces a value.
    Bail,
    /// Concurrent, completes once every tap has settled.
    Parallel,
    /// Synchronous, no suspension points.
    Sync,
}

impl Stage {
    /// The fixed execution order used by `run` and `run_from`.
    pub const SEQUENCE: [Stage; 6] = [
        Stage::InitEngine,
        Stage::ResourceLoad,
        Stage::ResourceParse,
        Stage::BuildScene,
        Stage::RenderLoop,
        Stage::PostProcess,
    ];

    /// Every stage, including `Dispose`.
    pub const ALL: [Stage; 7] = [
        Stage::InitEngine,
        Stage::ResourceLoad,
        Stage::ResourceParse,
        Stage::BuildScene,
        Stage::RenderLoop,
        Stage::PostProcess,
        Stage::Dispose,
    ];

    /// Returns the wire name of the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitEngine => "initEngine",
            Self::ResourceLoad => "resourceLoad",
            Self::ResourceParse => "resourceParse",
            Self::BuildScene => "buildScene",
            Self::RenderLoop => "renderLoop",
            Self::PostProcess => "postProcess",
            Self::Dispose => "dispose",
        }
    }

    /// Returns the composition kind of this stage's hook.
    #[must_use]
    pub const fn hook_kind(&self) -> HookKind {
        match self {
            Self::InitEngine | Self::ResourceLoad | Self::BuildScene => HookKind::Waterfall,
            Self::ResourceParse => HookKind::Bail,
            Self::RenderLoop => HookKind::Parallel,
            Self::PostProcess => HookKind::Series,
            Self::Dispose => HookKind::Sync,
        }
    }

    /// Position in [`Stage::SEQUENCE`], or `None` for `Dispose`.
    #[must_use]
    pub fn sequence_index(&self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|s| s == self)
    }

    /// The stages from `self` to the end of the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageNotInSequence`] for `Dispose`.
    pub fn sequence_from(&self) -> Result<&'static [Stage], PipelineError> {
        self.sequence_index()
            .map(|index| &Self::SEQUENCE[index..])
            .ok_or(PipelineError::StageNotInSequence(*self))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownStage(s.to_string()))
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Series => write!(f, "series"),
            Self::Waterfall => write!(f, "waterfall"),
            Self::Bail => write!(f, "bail"),
            Self::Parallel => write!(f, "parallel"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_round_trips_through_from_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_unknown_stage_name() {
        let err = "engineInit".parse::<Stage>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStage(ref name) if name == "engineInit"));
    }

    #[test]
    fn test_sequence_excludes_dispose() {
        assert!(!Stage::SEQUENCE.contains(&Stage::Dispose));
        assert_eq!(Stage::Dispose.sequence_index(), None);
        assert!(matches!(
            Stage::Dispose.sequence_from(),
            Err(PipelineError::StageNotInSequence(Stage::Dispose))
        ));
    }

    #[test]
    fn test_sequence_from_resource_load() {
        let tail = Stage::ResourceLoad.sequence_from().unwrap();
        assert_eq!(tail.first(), Some(&Stage::ResourceLoad));
        assert_eq!(tail.last(), Some(&Stage::PostProcess));
        assert_eq!(tail.len(), 5);
    }

    #[test]
    fn test_hook_kinds() {
        assert_eq!(Stage::InitEngine.hook_kind(), HookKind::Waterfall);
        assert_eq!(Stage::ResourceParse.hook_kind(), HookKind::Bail);
        assert_eq!(Stage::RenderLoop.hook_kind(), HookKind::Parallel);
        assert_eq!(Stage::PostProcess.hook_kind(), HookKind::Series);
        assert_eq!(Stage::Dispose.hook_kind(), HookKind::Sync);
    }

    #[test]
    fn test_stage_serialize() {
        let json = serde_json::to_string(&Stage::BuildScene).unwrap();
        assert_eq!(json, r#""buildScene""#);

        let stage: Stage = serde_json::from_str(r#""postProcess""#).unwrap();
        assert_eq!(stage, Stage::PostProcess);
    }
}
