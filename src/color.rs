use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// A color with floating point channels.
///
/// Channels are nominally in `[0, 1]`, but nothing enforces it: an un-normalized SIR cell can
/// carry channels above `1`. Values are only clipped when converted to bytes for display.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);
    pub const GREEN: Rgb = Rgb::new(0.0, 1.0, 0.0);
    pub const BLUE: Rgb = Rgb::new(0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Whether every channel lies in `[0, 1]`
    pub fn in_gamut(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| (0f32..=1f32).contains(c))
    }

    /// Clips to `[0, 1]` and scales to 8 bit channels.
    pub fn to_bytes(&self) -> [u8; 3] {
        let f = |c: f32| {
            if c.is_nan() {
                return 0;
            }

            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        };

        [f(self.r), f(self.g), f(self.b)]
    }

    /// Linear interpolation towards `other`. `p = 0` yields `self`, `p = 1` yields `other`.
    pub fn lerp(&self, other: &Rgb, p: f32) -> Rgb {
        assert!((0f32..=1f32).contains(&p), "lerp p lives in [0, 1]");

        // interpolate a channel
        let f = |a: f32, b: f32| a * (1f32 - p) + b * p;

        Rgb {
            r: f(self.r, other.r),
            g: f(self.g, other.g),
            b: f(self.b, other.b),
        }
    }
}

impl From<[f32; 3]> for Rgb {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [f32; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateColor {
    pub state: i64,
    pub color: Rgb,
}

/// Maps discrete cell states onto colors.
///
/// States without an entry are drawn with `fallback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub states: Vec<StateColor>,
    pub fallback: Rgb,
}

impl Palette {
    pub fn new(states: impl IntoIterator<Item = (i64, Rgb)>, fallback: Rgb) -> Self {
        let states = states
            .into_iter()
            .map(|(state, color)| StateColor { state, color })
            .collect();

        Self { states, fallback }
    }

    /// `0` is black, `1` is white, anything else is blue
    pub fn black_white() -> Self {
        Self::new([(0, Rgb::BLACK), (1, Rgb::WHITE)], Rgb::BLUE)
    }

    /// `0` is black, `1` is red, anything else is blue
    pub fn black_red() -> Self {
        Self::new([(0, Rgb::BLACK), (1, Rgb::RED)], Rgb::BLUE)
    }

    /// Looks up the color of `state`. If a state is listed twice, the last entry wins.
    pub fn color(&self, state: i64) -> Rgb {
        self.states
            .iter()
            .rev()
            .find(|entry| entry.state == state)
            .map_or(self.fallback, |entry| entry.color)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::black_white()
    }
}

#[derive(Debug, Error)]
pub enum ColormapError {
    #[error("A colormap needs at least two stops, found {found}")]
    TooFewStops { found: usize },

    #[error("Colormap stop position {pos} is outside [0, 1]")]
    OutOfRange { pos: f32 },

    #[error("Colormap stop positions must be non-decreasing ({prev} then {next})")]
    Unordered { prev: f32, next: f32 },
}

/// A continuous gradient defined by `(position, color)` stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colormap {
    stops: Vec<(f32, Rgb)>,
}

impl Colormap {
    pub fn new(stops: Vec<(f32, Rgb)>) -> Result<Self, ColormapError> {
        let map = Self { stops };
        map.validate()?;

        Ok(map)
    }

    /// Checks the invariants `new` enforces. Deserialized colormaps must be validated by hand.
    pub fn validate(&self) -> Result<(), ColormapError> {
        if self.stops.len() < 2 {
            return Err(ColormapError::TooFewStops {
                found: self.stops.len(),
            });
        }

        for &(pos, _) in &self.stops {
            if !(0f32..=1f32).contains(&pos) {
                return Err(ColormapError::OutOfRange { pos });
            }
        }

        for pair in self.stops.windows(2) {
            let (prev, next) = (pair[0].0, pair[1].0);
            if next < prev {
                return Err(ColormapError::Unordered { prev, next });
            }
        }

        Ok(())
    }

    /// White for susceptible, red for infected, green for recovered
    pub fn sir() -> Self {
        Self {
            stops: vec![(0.0, Rgb::WHITE), (0.5, Rgb::RED), (1.0, Rgb::GREEN)],
        }
    }

    pub fn gray() -> Self {
        Self {
            stops: vec![(0.0, Rgb::BLACK), (1.0, Rgb::WHITE)],
        }
    }

    pub fn blue_red() -> Self {
        Self {
            stops: vec![(0.0, Rgb::BLUE), (1.0, Rgb::RED)],
        }
    }

    /// Samples the gradient at `t`, clamped to `[0, 1]`.
    pub fn sample(&self, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        let Some(&(first_pos, first)) = self.stops.first() else {
            return Rgb::BLACK;
        };

        if t <= first_pos {
            return first;
        }

        for pair in self.stops.windows(2) {
            let ((a_pos, a), (b_pos, b)) = (pair[0], pair[1]);
            if t > b_pos {
                continue;
            }

            let span = b_pos - a_pos;
            if span <= 0.0 {
                return b;
            }

            return a.lerp(&b, ((t - a_pos) / span).clamp(0.0, 1.0));
        }

        self.stops.last().map_or(first, |&(_, c)| c)
    }
}

impl Default for Colormap {
    fn default() -> Self {
        Self::sir()
    }
}

#[cfg(test)]
mod test {
    use super::Colormap;
    use super::Palette;
    use super::Rgb;

    #[test]
    fn palette_fallback() {
        let palette = Palette::black_red();

        assert_eq!(palette.color(0), Rgb::BLACK);
        assert_eq!(palette.color(1), Rgb::RED);
        assert_eq!(palette.color(2), Rgb::BLUE);
        assert_eq!(palette.color(-1), Rgb::BLUE);
    }

    #[test]
    fn palette_last_entry_wins() {
        let palette = Palette::new([(1, Rgb::RED), (1, Rgb::GREEN)], Rgb::BLACK);

        assert_eq!(palette.color(1), Rgb::GREEN);
    }

    #[test]
    fn to_bytes_clips() {
        assert_eq!(Rgb::new(1.5, -0.2, 0.5).to_bytes(), [255, 0, 128]);
        assert_eq!(Rgb::new(f32::NAN, 0.0, 1.0).to_bytes(), [0, 0, 255]);
    }

    #[test]
    fn sir_colormap_stops() {
        let map = Colormap::sir();

        assert_eq!(map.sample(0.0), Rgb::WHITE);
        assert_eq!(map.sample(0.5), Rgb::RED);
        assert_eq!(map.sample(1.0), Rgb::GREEN);
        assert_eq!(map.sample(7.0), Rgb::GREEN);
        assert_eq!(map.sample(0.25), Rgb::new(1.0, 0.5, 0.5));
    }

    #[test]
    fn colormap_validation() {
        assert!(Colormap::new(vec![(0.0, Rgb::BLACK)]).is_err());
        assert!(Colormap::new(vec![(0.0, Rgb::BLACK), (1.5, Rgb::WHITE)]).is_err());
        assert!(Colormap::new(vec![(0.8, Rgb::BLACK), (0.2, Rgb::WHITE)]).is_err());
        assert!(Colormap::new(vec![(0.0, Rgb::BLACK), (1.0, Rgb::WHITE)]).is_ok());
    }
}
