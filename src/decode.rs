use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::CellCoord;
use crate::Error;
use crate::cell;
use crate::cell::CoordinateError;
use crate::cell::PayloadError;
use crate::cell::SirState;
use crate::color::Colormap;
use crate::color::Palette;
use crate::color::Rgb;
use crate::grid::GridBuffer;
use crate::grid::OutOfBounds;
use crate::log::EventLog;
use crate::log::EventRow;
use crate::log::Frame;

#[derive(Debug, Error)]
pub enum CellError {
    #[error("Malformed coordinate: {0}")]
    MalformedCoordinate(#[from] CoordinateError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    #[error("Out of bounds coordinate: {0}")]
    OutOfBoundsCoordinate(#[from] OutOfBounds),
}

/// How payloads are turned into colors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColorMode {
    /// `<population,s,i,r>` drawn as `(i, r, s)`
    #[default]
    Sir,

    /// `<state,...>` looked up in a palette
    State {
        #[serde(default)]
        palette: Palette,
    },

    /// Sum of every field, normalized over the whole log and drawn through a colormap
    Intensity {
        #[serde(default = "Colormap::blue_red")]
        colormap: Colormap,
    },
}

/// The value that maps to the top of the colormap in intensity mode.
///
/// It is the sum over every field position of the largest value seen at that position, so that a
/// cell holding every maximum at once would sit at `1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityScale(pub f64);

impl IntensityScale {
    pub fn from_log(log: &EventLog) -> Result<Self, Error> {
        let mut maxima: Vec<f64> = Vec::new();

        for row in log.rows() {
            let values = cell::parse_values(&row.payload)
                .map_err(|e| Error::row(row, CellError::MalformedPayload(e)))?;

            if maxima.len() < values.len() {
                maxima.resize(values.len(), 0.0);
            }

            for (max, value) in maxima.iter_mut().zip(values) {
                *max = max.max(value);
            }
        }

        Ok(Self(maxima.iter().sum()))
    }

    /// `value / scale`, or `0` for a degenerate scale
    pub fn normalize(&self, value: f64) -> f64 {
        if self.0 > 0.0 { value / self.0 } else { 0.0 }
    }
}

/// A decoded row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellUpdate {
    pub x: CellCoord,
    pub y: CellCoord,
    pub color: Rgb,
}

enum Mode {
    Sir,
    State(Palette),
    Intensity(Colormap, IntensityScale),
}

/// Turns log rows into cell colors and writes them into the grid.
pub struct Decoder {
    mode: Mode,

    /// Whether an out-of-gamut color was already reported
    warned_gamut: bool,
}

impl Decoder {
    pub fn sir() -> Self {
        Self::with_mode(Mode::Sir)
    }

    pub fn state(palette: Palette) -> Self {
        Self::with_mode(Mode::State(palette))
    }

    pub fn intensity(colormap: Colormap, scale: IntensityScale) -> Self {
        Self::with_mode(Mode::Intensity(colormap, scale))
    }

    /// Builds the decoder for `mode`, running the pre-pass over `log` if the mode needs one.
    pub fn prepare(mode: &ColorMode, log: &EventLog) -> Result<Self, Error> {
        let decoder = match mode {
            ColorMode::Sir => Self::sir(),
            ColorMode::State { palette } => Self::state(palette.clone()),
            ColorMode::Intensity { colormap } => {
                let scale = IntensityScale::from_log(log)?;
                debug!(scale = scale.0, "Computed intensity scale");

                Self::intensity(colormap.clone(), scale)
            }
        };

        Ok(decoder)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            warned_gamut: false,
        }
    }

    /// Decodes a raw coordinate and payload into a cell update.
    pub fn decode_cell(&self, coordinate: &str, payload: &str) -> Result<CellUpdate, CellError> {
        let (x, y) = cell::parse_coordinate(coordinate)?;
        let color = self.decode_payload(payload)?;

        Ok(CellUpdate { x, y, color })
    }

    pub fn decode_payload(&self, payload: &str) -> Result<Rgb, PayloadError> {
        let color = match &self.mode {
            Mode::Sir => {
                let state = SirState::parse(payload)?;

                if state.total() > 0.0 {
                    Rgb::new(
                        state.infected as f32,
                        state.recovered as f32,
                        state.susceptible as f32,
                    )
                } else {
                    Rgb::BLACK
                }
            }
            Mode::State(palette) => palette.color(cell::parse_state(payload)?),
            Mode::Intensity(colormap, scale) => {
                let sum: f64 = cell::parse_values(payload)?.iter().sum();

                colormap.sample(scale.normalize(sum) as f32)
            }
        };

        Ok(color)
    }

    /// Writes every row of `frame` into `grid`, in file order. Returns the number of cells written.
    ///
    /// Stops at the first row that fails to decode or lands outside the grid.
    pub fn apply_frame(&mut self, frame: &Frame, grid: &mut GridBuffer) -> Result<usize, Error> {
        for row in &frame.rows {
            self.apply_row(row, grid)?;
        }

        Ok(frame.rows.len())
    }

    fn apply_row(&mut self, row: &EventRow, grid: &mut GridBuffer) -> Result<(), Error> {
        let update = self
            .decode_cell(&row.coordinate, &row.payload)
            .map_err(|e| Error::row(row, e))?;

        if !self.warned_gamut && !update.color.in_gamut() {
            warn!(
                line = row.line,
                payload = %row.payload,
                "Cell color exceeds [0, 1] and will be clipped in the video"
            );
            self.warned_gamut = true;
        }

        grid.set(update.x, update.y, update.color)
            .map_err(|e| Error::row(row, CellError::from(e)))
    }
}
