//! Immutable per-run configuration built from command-line flags.

use crate::error::{GoneError, Result};

/// Which local tags are candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMode {
    /// Only tags missing from the remote.
    #[default]
    StaleOnly,
    /// Every local tag, without comparing against the remote.
    AllLocal,
}

/// How candidates are chosen before confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Take every candidate unchanged.
    All,
    Interactive,
}

/// Options for one invocation. Passed explicitly to the classifier and the
/// orchestrator; never stored globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunConfiguration {
    /// Skip the safe-tier yes/no prompt. Never skips the typed confirmation.
    pub force: bool,
    pub select_all: bool,
    /// Explicitly ask for the interactive selector.
    pub interactive: bool,
    pub include_unmerged: bool,
    pub tag_mode: TagMode,
}

impl RunConfiguration {
    /// Reject flag combinations before anything touches the repository.
    pub fn validate(&self) -> Result<()> {
        if self.select_all && self.force {
            return Err(GoneError::IncompatibleFlags {
                first: "-a (--all)",
                second: "-f (--force)",
            });
        }
        self.selection_mode().map(|_| ())
    }

    pub fn selection_mode(&self) -> Result<SelectionMode> {
        match (self.select_all, self.interactive) {
            (true, true) => Err(GoneError::IncompatibleSelectionMode),
            (true, false) => Ok(SelectionMode::All),
            (false, _) => Ok(SelectionMode::Interactive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_and_interactive() {
        let config = RunConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection_mode().unwrap(), SelectionMode::Interactive);
        assert_eq!(config.tag_mode, TagMode::StaleOnly);
    }

    #[test]
    fn test_select_all_with_force_rejected() {
        let config = RunConfiguration {
            select_all: true,
            force: true,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, GoneError::IncompatibleFlags { .. }));
        assert!(err.to_string().contains("incompatible"));
    }

    #[test]
    fn test_select_all_with_interactive_rejected() {
        let config = RunConfiguration {
            select_all: true,
            interactive: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GoneError::IncompatibleSelectionMode)
        ));
    }

    #[test]
    fn test_force_alone_is_valid() {
        let config = RunConfiguration {
            force: true,
            include_unmerged: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_select_all_mode() {
        let config = RunConfiguration {
            select_all: true,
            ..Default::default()
        };
        assert_eq!(config.selection_mode().unwrap(), SelectionMode::All);
    }
}
