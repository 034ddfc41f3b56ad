//! Semantic color theme for consistent terminal output
//!
//! - `ACTIVE` => blue - Spinners, headers, active elements
//! - `SUCCESS` => green - Deleted branches, success messages
//! - `WARNING` => yellow - Skipped branches, warnings
//! - `FAIL` => red - Failed deletions, errors

use std::sync::LazyLock;

use owo_colors::Style;

/// Semantic color definitions for terminal output
pub struct SemanticColors {
    /// Blue - spinners, headers, active elements
    pub active: Style,
    /// Green - completed operations, success messages
    pub success: Style,
    /// Yellow - warnings and skip reasons
    pub warning: Style,
    /// Red - errors
    pub fail: Style,
}

impl Default for SemanticColors {
    fn default() -> Self {
        Self {
            active: Style::new().blue(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            fail: Style::new().red(),
        }
    }
}

/// Global default theme
pub static COLORS: LazyLock<SemanticColors> = LazyLock::new(SemanticColors::default);
