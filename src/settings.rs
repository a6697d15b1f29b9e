use std::path::{Path, PathBuf};

use image::Rgba;

use crate::canvas::{Color, MAX_CANVAS_DIM, MIN_CANVAS_DIM};
use crate::components::history::DEFAULT_MAX_HISTORY;
use crate::ops::canvas_ops::THUMBNAIL_MAX_EDGE;

const SETTINGS_FILE: &str = "isopaint_settings.cfg";

/// Editor preferences persisted as plain `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    pub max_undo_steps: usize,
    pub default_canvas_width: u32,
    pub default_canvas_height: u32,
    pub thumbnail_max_edge: u32,
    /// Per-channel match tolerance for fill and colour replace (0 = exact).
    pub fill_tolerance: u8,
    pub brush_size: u32,
    pub snap_to_isometric: bool,
    pub primary_color: Color,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_HISTORY,
            default_canvas_width: 64,
            default_canvas_height: 64,
            thumbnail_max_edge: THUMBNAIL_MAX_EDGE,
            fill_tolerance: 0,
            brush_size: 1,
            snap_to_isometric: false,
            primary_color: Rgba([0, 0, 0, 255]),
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/isopaint/isopaint_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\IsoPaint\isopaint_settings.cfg
    /// On macOS:   ~/Library/Application Support/IsoPaint/isopaint_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("isopaint");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("IsoPaint").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("IsoPaint")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Serialize a colour as "r,g,b,a"
    fn color_to_str(c: Color) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a colour from "r,g,b,a"
    fn str_to_color(s: &str) -> Option<Color> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = parts[3].trim().parse::<u8>().ok()?;
        Some(Rgba([r, g, b, a]))
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             default_canvas_width={}\n\
             default_canvas_height={}\n\
             thumbnail_max_edge={}\n\
             fill_tolerance={}\n\
             brush_size={}\n\
             snap_to_isometric={}\n\
             primary_color={}\n",
            self.max_undo_steps,
            self.default_canvas_width,
            self.default_canvas_height,
            self.thumbnail_max_edge,
            self.fill_tolerance,
            self.brush_size,
            self.snap_to_isometric,
            Self::color_to_str(self.primary_color),
        )
    }

    /// Parse `key=value` lines.  Unknown keys are ignored; malformed or
    /// out-of-range values keep their defaults.
    pub fn parse(content: &str) -> Self {
        let d = Self::default();
        let mut s = Self::default();
        let dim = |val: &str, fallback: u32| {
            val.parse::<u32>()
                .ok()
                .filter(|v| (MIN_CANVAS_DIM..=MAX_CANVAS_DIM).contains(v))
                .unwrap_or(fallback)
        };
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_undo_steps" => {
                    s.max_undo_steps = val
                        .parse()
                        .ok()
                        .filter(|v| *v > 0)
                        .unwrap_or(d.max_undo_steps);
                }
                "default_canvas_width" => {
                    s.default_canvas_width = dim(val, d.default_canvas_width);
                }
                "default_canvas_height" => {
                    s.default_canvas_height = dim(val, d.default_canvas_height);
                }
                "thumbnail_max_edge" => {
                    s.thumbnail_max_edge = val
                        .parse()
                        .ok()
                        .filter(|v| *v > 0)
                        .unwrap_or(d.thumbnail_max_edge);
                }
                "fill_tolerance" => {
                    s.fill_tolerance = val.parse().unwrap_or(d.fill_tolerance);
                }
                "brush_size" => {
                    s.brush_size = val
                        .parse()
                        .ok()
                        .filter(|v| (1..=256).contains(v))
                        .unwrap_or(d.brush_size);
                }
                "snap_to_isometric" => {
                    s.snap_to_isometric = val == "true";
                }
                "primary_color" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.primary_color = c;
                    }
                }
                _ => {}
            }
        }
        s
    }

    /// Load from `path` (defaults if the file is missing or unreadable).
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from the platform location.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Save settings to the platform location.  Failures are logged.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else {
            return;
        };
        if let Err(e) = self.save_to(&path) {
            crate::log_warn!("Failed to save settings to {}: {}", path.display(), e);
        }
    }
}
