//! Colour palettes for the light, dark, and system themes.

use crate::paint::Color;

/// The name of a theme as stored in the user's settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThemeKind {
    Light,
    Dark,
    /// Follow the platform. Also used for any unrecognized theme name.
    System,
}
impl ThemeKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::Light,
            "dark" => Self::Dark,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

/// Whether a palette is for a focused (active) or unfocused (inactive) window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorGroup {
    #[default]
    Active,
    Inactive,
}

/// The colours of the standard UI roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub group: ColorGroup,
    pub window: Color,
    pub window_text: Color,
    pub base: Color,
    pub alternate_base: Color,
    pub text: Color,
    pub button: Color,
    pub button_text: Color,
    pub highlight: Color,
    pub highlighted_text: Color,
    pub tooltip_base: Color,
    pub tooltip_text: Color,
    pub light: Color,
    pub mid: Color,
    pub dark: Color,
    pub link: Color,
}

impl Palette {
    pub fn from_theme(kind: ThemeKind) -> Self {
        match kind {
            ThemeKind::Light => Self {
                group: ColorGroup::Active,
                window: Color::rgb(0xff, 0xff, 0xff),
                window_text: Color::rgb(0x33, 0x33, 0x33),
                base: Color::rgb(0xff, 0xff, 0xff),
                alternate_base: Color::rgb(0xf2, 0xf2, 0xf2),
                text: Color::rgb(0x33, 0x33, 0x33),
                button: Color::rgb(0xff, 0xff, 0xff),
                button_text: Color::rgb(0x55, 0x55, 0x55),
                highlight: Color::rgb(0x38, 0xa3, 0xd8),
                highlighted_text: Color::rgb(0xf4, 0xf4, 0xf5),
                tooltip_base: Color::rgb(0xff, 0xff, 0xff),
                tooltip_text: Color::rgb(0x33, 0x33, 0x33),
                light: Color::rgb(0xef, 0xef, 0xef),
                mid: Color::rgb(0x70, 0x70, 0x70),
                dark: Color::rgb(0xdc, 0xdc, 0xdc),
                link: Color::rgb(0x00, 0x77, 0xb5),
            },
            ThemeKind::Dark => Self {
                group: ColorGroup::Active,
                window: Color::rgb(0x2d, 0x31, 0x39),
                window_text: Color::rgb(0xca, 0xcc, 0xd1),
                base: Color::rgb(0x2d, 0x31, 0x39),
                alternate_base: Color::rgb(0x38, 0x3c, 0x44),
                text: Color::rgb(0xca, 0xcc, 0xd1),
                button: Color::rgb(0x2d, 0x31, 0x39),
                button_text: Color::rgb(0x82, 0x82, 0x84),
                highlight: Color::rgb(0x38, 0xa3, 0xd8),
                highlighted_text: Color::rgb(0xf4, 0xf5, 0xf8),
                tooltip_base: Color::rgb(0x2d, 0x31, 0x39),
                tooltip_text: Color::rgb(0xca, 0xcc, 0xd1),
                light: Color::rgb(0x41, 0x41, 0x41),
                mid: Color::rgb(0x20, 0x22, 0x28),
                dark: Color::rgb(0x20, 0x22, 0x28),
                link: Color::rgb(0x38, 0xa3, 0xd8),
            },
            ThemeKind::System => Self {
                group: ColorGroup::Active,
                window: Color::rgb(0xef, 0xef, 0xef),
                window_text: Color::rgb(0x00, 0x00, 0x00),
                base: Color::rgb(0xff, 0xff, 0xff),
                alternate_base: Color::rgb(0xf7, 0xf7, 0xf7),
                text: Color::rgb(0x00, 0x00, 0x00),
                button: Color::rgb(0xef, 0xef, 0xef),
                button_text: Color::rgb(0x00, 0x00, 0x00),
                highlight: Color::rgb(0x30, 0x8c, 0xc6),
                highlighted_text: Color::rgb(0xff, 0xff, 0xff),
                tooltip_base: Color::rgb(0xff, 0xff, 0xdc),
                tooltip_text: Color::rgb(0x00, 0x00, 0x00),
                light: Color::rgb(0xff, 0xff, 0xff),
                mid: Color::rgb(0xb8, 0xb8, 0xb8),
                dark: Color::rgb(0x9f, 0x9f, 0x9f),
                link: Color::rgb(0x00, 0x00, 0xff),
            },
        }
    }

    /// Returns this palette for use in an unfocused window.
    pub fn inactive(mut self) -> Self {
        self.group = ColorGroup::Inactive;
        self
    }
}

/// Theme colours that don't correspond to a standard palette role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub sidebar_background: Color,
    pub alternate_button: Color,
    pub separator: Color,
    pub red: Color,
    pub orange: Color,
    pub green: Color,
    pub error: Color,
}

impl Theme {
    pub fn new(kind: ThemeKind) -> Self {
        match kind {
            ThemeKind::Light => Self {
                sidebar_background: Color::rgb(0x23, 0x36, 0x49),
                alternate_button: Color::rgb(0xcc, 0xcc, 0xcc),
                separator: Color::rgb(0xe7, 0xe7, 0xe7),
                red: Color::rgb(0xa8, 0x23, 0x53),
                orange: Color::rgb(0xfc, 0xbe, 0x05),
                green: Color::rgb(0x4a, 0xc0, 0x59),
                error: Color::rgb(0xdd, 0x3d, 0x3d),
            },
            ThemeKind::Dark => Self {
                sidebar_background: Color::rgb(0x2d, 0x31, 0x39),
                alternate_button: Color::rgb(0x41, 0x41, 0x41),
                separator: Color::rgb(0x4a, 0x4d, 0x53),
                red: Color::rgb(0xa8, 0x23, 0x53),
                orange: Color::rgb(0xfc, 0xc5, 0x3a),
                green: Color::rgb(0x4a, 0xc0, 0x59),
                error: Color::rgb(0xdd, 0x3d, 0x3d),
            },
            ThemeKind::System => Self {
                sidebar_background: Color::rgb(0x30, 0x8c, 0xc6),
                alternate_button: Color::rgb(0xcc, 0xcc, 0xcc),
                separator: Color::rgb(0xb8, 0xb8, 0xb8),
                red: Color::rgb(0xff, 0x00, 0x00),
                orange: Color::rgb(0xff, 0xa5, 0x00),
                green: Color::rgb(0x00, 0x80, 0x00),
                error: Color::rgb(0xdd, 0x3d, 0x3d),
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_theme_names_are_system() {
        assert_eq!(ThemeKind::from_name("light"), ThemeKind::Light);
        assert_eq!(ThemeKind::from_name("dark"), ThemeKind::Dark);
        assert_eq!(ThemeKind::from_name("system"), ThemeKind::System);
        assert_eq!(ThemeKind::from_name("solarized"), ThemeKind::System);
    }

    #[test]
    fn test_inactive_palette_keeps_colors() {
        let active = Palette::from_theme(ThemeKind::Dark);
        let inactive = active.inactive();
        assert_eq!(inactive.group, ColorGroup::Inactive);
        assert_eq!(inactive.window, active.window);
        assert_eq!(inactive.text, active.text);
    }
}
