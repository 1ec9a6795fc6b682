use crate::CoreError;
use serde::Serialize;

/// Stages of a single detach run, in order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetachState {
    Init,
    PreflightValidated,
    FilesCopied,
    ManifestMerged,
    ManifestWritten,
    ToolRemoved,
    DependenciesReinstalled,
    Done,
    Aborted,
}

impl std::fmt::Display for DetachState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetachState::Init => write!(f, "init"),
            DetachState::PreflightValidated => write!(f, "preflight-validated"),
            DetachState::FilesCopied => write!(f, "files-copied"),
            DetachState::ManifestMerged => write!(f, "manifest-merged"),
            DetachState::ManifestWritten => write!(f, "manifest-written"),
            DetachState::ToolRemoved => write!(f, "tool-removed"),
            DetachState::DependenciesReinstalled => write!(f, "dependencies-reinstalled"),
            DetachState::Done => write!(f, "done"),
            DetachState::Aborted => write!(f, "aborted"),
        }
    }
}

pub fn validate_transition(from: DetachState, to: DetachState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (DetachState::Init, DetachState::PreflightValidated)
            | (DetachState::PreflightValidated, DetachState::FilesCopied)
            | (DetachState::FilesCopied, DetachState::ManifestMerged)
            | (DetachState::ManifestMerged, DetachState::ManifestWritten)
            | (DetachState::ManifestWritten, DetachState::ToolRemoved)
            | (DetachState::ToolRemoved, DetachState::DependenciesReinstalled)
            | (DetachState::DependenciesReinstalled, DetachState::Done)
            | (
                DetachState::Init | DetachState::PreflightValidated,
                DetachState::Aborted
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
