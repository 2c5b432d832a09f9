use crate::style::Palette;
use directories::BaseDirs;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs, io,
    io::IsTerminal,
    path::PathBuf,
};

pub const RC_FILE: &str = ".fancylinerc.json";
pub const HISTORY_FILE: &str = ".fancyline_history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    On,
    Off,
    Auto,
}

/// Session options as configured: defaults overlaid with the rc file.
/// `resolve` turns this into the settings the completion core consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub use_colors: ColorMode,
    pub consider_getitems: bool,
    pub prefer_fancy: bool,
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            use_colors: ColorMode::Auto,
            consider_getitems: true,
            prefer_fancy: true,
            palette: Palette::default(),
        }
    }
}

/// Shape of `~/.fancylinerc.json`: every field optional, unknown fields
/// tolerated.
#[derive(Debug, Default, Deserialize)]
pub struct Overrides {
    pub use_colors: Option<ColorMode>,
    pub consider_getitems: Option<bool>,
    pub prefer_fancy: Option<bool>,
    pub colors: Option<BTreeMap<String, String>>,
}

impl Config {
    /// Defaults plus whatever the rc file overrides. A missing file is
    /// normal; anything else wrong with it is logged and ignored.
    pub fn load() -> Config {
        let mut config = Config::default();
        let path = match rc_path() {
            Some(path) => path,
            None => return config,
        };
        match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Overrides>(&text) {
                Ok(overrides) => config.apply(overrides),
                Err(err) => log::warn!("ignoring malformed {}: {}", path.display(), err),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("could not read {}: {}", path.display(), err),
        }
        config
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(mode) = overrides.use_colors {
            self.use_colors = mode;
        }
        if let Some(flag) = overrides.consider_getitems {
            self.consider_getitems = flag;
        }
        if let Some(flag) = overrides.prefer_fancy {
            self.prefer_fancy = flag;
        }
        if let Some(colors) = overrides.colors {
            self.palette.apply_overrides(&colors);
        }
    }

    /// Pick the line-editing backend and pin down `Auto` coloring against
    /// its capabilities.
    pub fn resolve(self) -> (Settings, Backend) {
        let backend = Backend::find_best(self.prefer_fancy);
        let use_colors = match self.use_colors {
            ColorMode::On => true,
            ColorMode::Off => false,
            ColorMode::Auto => backend.supports_color,
        };
        (
            Settings {
                use_colors,
                consider_getitems: self.consider_getitems,
                palette: self.palette,
            },
            backend,
        )
    }
}

/// What the completion core actually consumes, fixed before the first
/// request.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub use_colors: bool,
    pub consider_getitems: bool,
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The rustyline editor: completion, history, color-capable.
    Fancy,
    /// Raw stdin fallback, no completion and no escapes.
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backend {
    pub kind: BackendKind,
    pub supports_color: bool,
}

impl Backend {
    pub fn find_best(prefer_fancy: bool) -> Backend {
        let dumb_term = env::var("TERM").map(|t| t == "dumb").unwrap_or(false);
        if prefer_fancy && io::stdout().is_terminal() && !dumb_term {
            Backend {
                kind: BackendKind::Fancy,
                supports_color: true,
            }
        } else {
            Backend {
                kind: BackendKind::Plain,
                supports_color: false,
            }
        }
    }
}

fn rc_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(RC_FILE))
}

pub fn history_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(HISTORY_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{codes, TypeClass};
    use pretty_assertions::assert_eq;

    #[test]
    fn overrides_replace_only_named_fields() {
        let mut config = Config::default();
        let overrides: Overrides =
            serde_json::from_str(r#"{"use_colors": "off", "colors": {"text": "31"}}"#).unwrap();
        config.apply(overrides);
        assert_eq!(config.use_colors, ColorMode::Off);
        assert!(config.consider_getitems);
        assert!(config.prefer_fancy);
        assert_eq!(config.palette.code_for(TypeClass::Text), "31");
        assert_eq!(config.palette.code_for(TypeClass::Number), codes::YELLOW);
    }

    #[test]
    fn malformed_overrides_do_not_parse() {
        assert!(serde_json::from_str::<Overrides>(r#"{"use_colors": "sometimes"}"#).is_err());
    }

    #[test]
    fn explicit_color_modes_ignore_backend_support() {
        let mut config = Config::default();
        config.prefer_fancy = false; // deterministic Plain backend
        config.use_colors = ColorMode::On;
        let (settings, backend) = config.clone().resolve();
        assert_eq!(backend.kind, BackendKind::Plain);
        assert!(settings.use_colors);

        config.use_colors = ColorMode::Off;
        let (settings, _) = config.resolve();
        assert!(!settings.use_colors);
    }

    #[test]
    fn auto_colors_follow_the_backend() {
        let mut config = Config::default();
        config.prefer_fancy = false;
        let (settings, backend) = config.resolve();
        assert!(!backend.supports_color);
        assert!(!settings.use_colors);
    }
}
