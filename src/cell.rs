use thiserror::Error;

use crate::CellCoord;
use crate::parse_util;
use crate::parse_util::ConvertError;

#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("Expected 2 coordinates, found {found}")]
    Arity { found: usize },

    #[error("Failed to parse x coordinate: {0}")]
    ParseX(#[source] ConvertError),

    #[error("Failed to parse y coordinate: {0}")]
    ParseY(#[source] ConvertError),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Expected {expected} fields, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("Empty payload")]
    Empty,

    #[error("Failed to parse field {index}: {source}")]
    Field {
        index: usize,
        #[source]
        source: ConvertError,
    },
}

/// Parses a cell coordinate of the form `(x,y)`.
///
/// The parentheses are optional and whitespace around either number is ignored.
pub fn parse_coordinate(raw: &str) -> Result<(CellCoord, CellCoord), CoordinateError> {
    let bytes = parse_util::strip_enclosing(b'(', b')', raw.as_bytes());
    let fields: Vec<&[u8]> = parse_util::split_fields(b',', bytes).collect();

    let [x, y] = fields[..] else {
        return Err(CoordinateError::Arity {
            found: fields.len(),
        });
    };

    let x = parse_util::convert(x).map_err(CoordinateError::ParseX)?;
    let y = parse_util::convert(y).map_err(CoordinateError::ParseY)?;

    Ok((x, y))
}

/// The body of a payload `<a,b,...>`, split into its fields.
fn payload_fields(raw: &str) -> Vec<&[u8]> {
    let bytes = parse_util::strip_enclosing(b'<', b'>', raw.as_bytes());

    parse_util::split_fields(b',', bytes).collect()
}

/// Population counts of an SIR cell, `<population,s,i,r>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirState {
    pub population: f64,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl SirState {
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let fields = payload_fields(raw);

        let [population, susceptible, infected, recovered] = fields[..] else {
            return Err(PayloadError::Arity {
                expected: 4,
                found: fields.len(),
            });
        };

        let f = |index: usize, bytes: &[u8]| {
            parse_util::convert::<f64>(bytes).map_err(|source| PayloadError::Field { index, source })
        };

        Ok(Self {
            population: f(0, population)?,
            susceptible: f(1, susceptible)?,
            infected: f(2, infected)?,
            recovered: f(3, recovered)?,
        })
    }

    /// `s + i + r`. The population field is not part of it.
    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }
}

/// Parses the leading integer of a payload `<state,...>`. Trailing fields are ignored.
pub fn parse_state(raw: &str) -> Result<i64, PayloadError> {
    let fields = payload_fields(raw);

    let Some(&state) = fields.first() else {
        return Err(PayloadError::Empty);
    };

    if parse_util::trim_ws(state).is_empty() {
        return Err(PayloadError::Empty);
    }

    parse_util::convert(state).map_err(|source| PayloadError::Field { index: 0, source })
}

/// Parses every field of a payload as a number.
pub fn parse_values(raw: &str) -> Result<Vec<f64>, PayloadError> {
    let fields = payload_fields(raw);

    if let [only] = fields[..] {
        if parse_util::trim_ws(only).is_empty() {
            return Err(PayloadError::Empty);
        }
    }

    fields
        .into_iter()
        .enumerate()
        .map(|(index, bytes)| {
            parse_util::convert(bytes).map_err(|source| PayloadError::Field { index, source })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::CoordinateError;
    use super::PayloadError;
    use super::SirState;

    #[test]
    fn coordinate() {
        assert_eq!(super::parse_coordinate("(3,7)").unwrap(), (3, 7));
        assert_eq!(super::parse_coordinate("( -2 , 11 )").unwrap(), (-2, 11));
        assert_eq!(super::parse_coordinate("4,5").unwrap(), (4, 5));
    }

    #[test]
    fn coordinate_arity() {
        assert!(matches!(
            super::parse_coordinate("(1,2,3)"),
            Err(CoordinateError::Arity { found: 3 })
        ));
        assert!(matches!(
            super::parse_coordinate("(1)"),
            Err(CoordinateError::Arity { found: 1 })
        ));
        assert!(matches!(
            super::parse_coordinate("top"),
            Err(CoordinateError::Arity { found: 1 })
        ));
    }

    #[test]
    fn coordinate_not_integer() {
        assert!(matches!(
            super::parse_coordinate("(1.5,2)"),
            Err(CoordinateError::ParseX(_))
        ));
        assert!(matches!(
            super::parse_coordinate("(1,)"),
            Err(CoordinateError::ParseY(_))
        ));
    }

    #[test]
    fn sir() {
        let state = SirState::parse("<100,0.2,0.3,0.5>").unwrap();

        assert_eq!(state.population, 100.0);
        assert_eq!(state.susceptible, 0.2);
        assert_eq!(state.infected, 0.3);
        assert_eq!(state.recovered, 0.5);
    }

    #[test]
    fn sir_arity() {
        assert!(matches!(
            SirState::parse("<1,2,3>"),
            Err(PayloadError::Arity {
                expected: 4,
                found: 3
            })
        ));
        assert!(matches!(
            SirState::parse("<1,2,x,4>"),
            Err(PayloadError::Field { index: 2, .. })
        ));
    }

    #[test]
    fn state() {
        assert_eq!(super::parse_state("<1,0.5,7>").unwrap(), 1);
        assert_eq!(super::parse_state("<0>").unwrap(), 0);
        assert_eq!(super::parse_state("<3,x>").unwrap(), 3);

        assert!(matches!(super::parse_state("<>"), Err(PayloadError::Empty)));
        assert!(matches!(
            super::parse_state("<on>"),
            Err(PayloadError::Field { index: 0, .. })
        ));
    }

    #[test]
    fn values() {
        assert_eq!(super::parse_values("<1,2.5>").unwrap(), vec![1.0, 2.5]);
        assert!(matches!(super::parse_values("< >"), Err(PayloadError::Empty)));
    }
}
