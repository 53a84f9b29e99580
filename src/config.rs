use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::CellCoord;
use crate::color::Colormap;
use crate::color::ColormapError;
use crate::color::Palette;
use crate::color::Rgb;
use crate::decode::ColorMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid colormap: {0}")]
    Colormap(#[from] ColormapError),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Field delimiter, unless the log declares its own with a `sep=` line
    pub delimiter: char,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { delimiter: ';' }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,

    /// World coordinate of the top-left cell
    pub origin: (CellCoord, CellCoord),
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            origin: (0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw borders between cells
    pub gridlines: bool,

    pub gridline_color: Rgb,

    /// Draw the colormap next to the grid
    pub colorbar: bool,

    pub background: Rgb,

    /// Color of the title and colorbar outline
    pub foreground: Rgb,

    /// Gradient shown by the colorbar
    pub colormap: Colormap,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            gridlines: false,
            gridline_color: Rgb::WHITE,
            colorbar: true,
            background: Rgb::WHITE,
            foreground: Rgb::BLACK,
            colormap: Colormap::sir(),
        }
    }
}

/// Everything a run needs, loaded from TOML.
///
/// Every field has a default, so a config file only lists what it changes. The defaults are the
/// SIR preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the video is written
    pub output: PathBuf,

    /// Output resolution, pixels per inch of `figure_size`
    pub dpi: u32,

    /// Playback time of one frame, independent of simulation time
    pub interval_ms: u32,

    /// Frame size in inches
    pub figure_size: (f64, f64),

    /// Encoder program
    pub ffmpeg: String,

    pub log: LogConfig,
    pub grid: GridConfig,
    pub decode: ColorMode,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::sir()
    }
}

impl Config {
    /// 1000x1000 SIR grid drawn as `(i, r, s)`, with the SIR colorbar
    pub fn sir() -> Self {
        Self {
            output: PathBuf::from("SIR_animation.mp4"),
            dpi: 300,
            interval_ms: 100,
            figure_size: (6.4, 4.8),
            ffmpeg: "ffmpeg".to_string(),
            log: LogConfig::default(),
            grid: GridConfig::default(),
            decode: ColorMode::Sir,
            render: RenderConfig::default(),
        }
    }

    /// 20x20 binary grid, black and white with gridlines, one frame a second
    pub fn gate() -> Self {
        Self {
            output: PathBuf::from("Gate_animation.mp4"),
            dpi: 150,
            interval_ms: 1000,
            grid: GridConfig {
                width: 20,
                height: 20,
                origin: (0, 0),
            },
            decode: ColorMode::State {
                palette: Palette::black_white(),
            },
            render: RenderConfig {
                gridlines: true,
                colorbar: false,
                colormap: Colormap::gray(),
                ..RenderConfig::default()
            },
            ..Self::sir()
        }
    }

    /// 100x100 binary grid, infected cells in red
    pub fn infection() -> Self {
        Self {
            output: PathBuf::from("infection_animation.mp4"),
            dpi: 150,
            interval_ms: 100,
            grid: GridConfig {
                width: 100,
                height: 100,
                origin: (0, 0),
            },
            decode: ColorMode::State {
                palette: Palette::black_red(),
            },
            render: RenderConfig {
                colorbar: false,
                colormap: Colormap::gray(),
                ..RenderConfig::default()
            },
            ..Self::sir()
        }
    }

    /// Parses a config and validates it.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;

        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The encoder program, `LOGVIZ_FFMPEG` taking precedence over the config.
    pub fn ffmpeg_program(&self) -> String {
        std::env::var(crate::render::encoder::FFMPEG_ENV).unwrap_or_else(|_| self.ffmpeg.clone())
    }

    /// The delimiter as a single byte
    pub fn delimiter(&self) -> Result<u8, ConfigError> {
        let c = self.log.delimiter;

        u8::try_from(c)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ConfigError::Invalid(format!("Delimiter '{c}' is not a single ASCII byte")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.grid.width == 0 || self.grid.height == 0 {
            return invalid("Grid dimensions must be positive");
        }

        if self.grid.width.checked_mul(self.grid.height).is_none() {
            return invalid("Grid is too large");
        }

        if self.dpi == 0 {
            return invalid("dpi must be positive");
        }

        if self.interval_ms == 0 {
            return invalid("interval_ms must be positive");
        }

        let (w, h) = self.figure_size;
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return invalid("figure_size must be positive");
        }

        if self.output.as_os_str().is_empty() {
            return invalid("output must not be empty");
        }

        self.delimiter()?;
        self.render.colormap.validate()?;

        if let ColorMode::Intensity { colormap } = &self.decode {
            colormap.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use super::ConfigError;
    use crate::color::Palette;
    use crate::color::Rgb;
    use crate::decode::ColorMode;

    #[test]
    fn presets_are_valid() {
        for config in [Config::sir(), Config::gate(), Config::infection()] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn empty_file_is_the_sir_preset() {
        assert_eq!(Config::from_toml("").unwrap(), Config::sir());
    }

    #[test]
    fn partial_file() {
        let text = r#"
output = "gate.mp4"

[grid]
width = 20
height = 20

[decode]
mode = "state"

[decode.palette]
fallback = [0.0, 0.0, 1.0]

[[decode.palette.states]]
state = 0
color = [0.0, 0.0, 0.0]

[[decode.palette.states]]
state = 1
color = [1.0, 0.0, 0.0]
"#;
        let config = Config::from_toml(text).unwrap();

        assert_eq!(config.grid.width, 20);
        assert_eq!(config.grid.origin, (0, 0));
        assert_eq!(config.dpi, 300);
        assert_eq!(
            config.decode,
            ColorMode::State {
                palette: Palette::black_red()
            }
        );
    }

    #[test]
    fn round_trips_through_toml() {
        for config in [Config::sir(), Config::gate(), Config::infection()] {
            let text = config.to_toml().unwrap();

            assert_eq!(Config::from_toml(&text).unwrap(), config);
        }
    }

    #[test]
    fn rejects_zero_sizes() {
        let err = Config::from_toml("[grid]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::from_toml("dpi = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::from_toml("interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_wide_delimiter() {
        let err = Config::from_toml("[log]\ndelimiter = \"é\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = Config::from_toml("[log]\ndelimiter = \",\"\n").unwrap();
        assert_eq!(config.delimiter().unwrap(), b',');
    }

    #[test]
    fn rejects_bad_colormap() {
        let text = "[render]\ncolormap = { stops = [[0.0, [0.0, 0.0, 0.0]]] }\n";
        let err = Config::from_toml(text).unwrap_err();

        assert!(matches!(err, ConfigError::Colormap(_)));
    }

    #[test]
    fn intensity_mode_defaults_to_blue_red() {
        let config = Config::from_toml("[decode]\nmode = \"intensity\"\n").unwrap();

        let ColorMode::Intensity { colormap } = config.decode else {
            panic!("expected intensity mode");
        };
        assert_eq!(colormap.sample(1.0), Rgb::RED);
    }
}
