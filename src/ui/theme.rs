//! # Theme System
//!
//! Colors for the parts of the screen vatch draws itself: the three header
//! rows. The command's own output keeps the colors it asked for.
//!
//! ## Built-in Themes
//!
//! - **Terminal** (default) - named ANSI colors, follows the terminal palette
//! - **Catppuccin Mocha** - warm, dark pastel theme
//! - **Dracula** - dark theme with vivid colors
//! - **Nord** - arctic, north-bluish color palette
//! - **Gruvbox Dark** - retro groove color scheme
//!
//! A theme is chosen once at startup (the `theme` config key) and handed to the
//! controller; there is no global theme state.

use ratatui::style::{Color, Modifier, Style};

/// Header colors, grouped by semantic role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Name used in the config file.
    pub name: &'static str,

    /// `Every Ns: command` title.
    pub accent: Color,
    /// Host name, timestamp and the diagnostics row.
    pub fg_dim: Color,
    /// The idle banner.
    pub error: Color,
}

impl Theme {
    /// Return the list of all built-in themes.
    pub fn all() -> &'static [Theme] {
        &BUILT_IN_THEMES
    }

    /// Find a built-in theme by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        BUILT_IN_THEMES
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Return the default theme (Terminal).
    pub fn default_theme() -> &'static Theme {
        &BUILT_IN_THEMES[0]
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn idle_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme().clone()
    }
}

static BUILT_IN_THEMES: [Theme; 5] = [
    // 0 - Terminal (default)
    Theme {
        name: "Terminal",
        accent: Color::Reset,
        fg_dim: Color::DarkGray,
        error: Color::Red,
    },
    // 1 - Catppuccin Mocha
    Theme {
        name: "Catppuccin Mocha",
        accent: Color::Rgb(137, 180, 250), // blue
        fg_dim: Color::Rgb(108, 112, 134), // overlay0
        error: Color::Rgb(243, 139, 168),  // red
    },
    // 2 - Dracula
    Theme {
        name: "Dracula",
        accent: Color::Rgb(139, 233, 253), // cyan
        fg_dim: Color::Rgb(98, 114, 164),
        error: Color::Rgb(255, 85, 85),
    },
    // 3 - Nord
    Theme {
        name: "Nord",
        accent: Color::Rgb(136, 192, 208), // frost
        fg_dim: Color::Rgb(76, 86, 106),
        error: Color::Rgb(191, 97, 106),
    },
    // 4 - Gruvbox Dark
    Theme {
        name: "Gruvbox Dark",
        accent: Color::Rgb(131, 165, 152),
        fg_dim: Color::Rgb(146, 131, 116),
        error: Color::Rgb(251, 73, 52),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    /// Convert a catppuccin color to a ratatui Color via its RGB values.
    fn ctp(color: catppuccin::Color) -> Color {
        Color::Rgb(color.rgb.r, color.rgb.g, color.rgb.b)
    }

    #[test]
    fn test_default_is_terminal() {
        assert_eq!(Theme::default_theme().name, "Terminal");
        assert_eq!(Theme::default().error, Color::Red);
    }

    #[test]
    fn test_by_name_case_insensitive() {
        assert!(Theme::by_name("catppuccin mocha").is_some());
        assert!(Theme::by_name("NORD").is_some());
        assert!(Theme::by_name("nonexistent").is_none());
    }

    #[test]
    fn test_catppuccin_mocha_matches_palette() {
        let mocha = catppuccin::PALETTE.mocha.colors;
        let theme = Theme::by_name("Catppuccin Mocha").expect("theme exists");
        assert_eq!(theme.accent, ctp(mocha.blue));
        assert_eq!(theme.fg_dim, ctp(mocha.overlay0));
        assert_eq!(theme.error, ctp(mocha.red));
    }

    #[test]
    fn test_idle_style_is_bold_error() {
        let theme = Theme::by_name("Nord").expect("theme exists");
        let style = theme.idle_style();
        assert_eq!(style.fg, Some(theme.error));
        assert!(style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_all_themes_have_distinct_names() {
        let names: Vec<&str> = Theme::all().iter().map(|t| t.name).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(names.len(), unique.len(), "duplicate theme names found");
    }
}
