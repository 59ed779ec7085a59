use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A color with red, green, blue and alpha channels, each in `[0.0, 1.0]`.
///
/// Channels read back from the host are copied as-is. Values supplied by a
/// caller go through [`Rgba::new`] (or deserialization, which uses it) and are
/// rejected when out of range instead of being clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RgbaFields")]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Result<Self> {
        for (name, value) in [("r", r), ("g", g), ("b", b), ("a", a)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "color channel {name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(Self { r, g, b, a })
    }

    /// Parse `"r,g,b"` or `"r,g,b,a"`; alpha defaults to 1.
    pub fn parse(s: &str) -> Result<Self> {
        let channels = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidInput(format!("invalid color '{s}': {e}")))?;

        match channels.as_slice() {
            [r, g, b] => Self::new(*r, *g, *b, 1.0),
            [r, g, b, a] => Self::new(*r, *g, *b, *a),
            _ => Err(Error::InvalidInput(format!(
                "invalid color '{s}': expected 3 or 4 channels"
            ))),
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Deserialize)]
struct RgbaFields {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
}

impl TryFrom<RgbaFields> for Rgba {
    type Error = Error;

    fn try_from(fields: RgbaFields) -> Result<Self> {
        Rgba::new(fields.r, fields.g, fields.b, fields.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_channels_on_the_boundary() {
        let color = Rgba::new(0.0, 1.0, 0.5, 1.0).unwrap();
        assert_eq!(color.g, 1.0);
    }

    #[test]
    fn rejects_out_of_range_instead_of_clamping() {
        assert!(matches!(Rgba::new(1.2, 0.0, 0.0, 1.0), Err(Error::InvalidInput(_))));
        assert!(matches!(Rgba::new(0.0, -0.1, 0.0, 1.0), Err(Error::InvalidInput(_))));
        assert!(Rgba::new(f64::NAN, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn deserialization_goes_through_validation() {
        let ok: Rgba = serde_json::from_str(r#"{"r":0.1,"g":0.2,"b":0.3,"a":1.0}"#).unwrap();
        assert_eq!(ok, Rgba { r: 0.1, g: 0.2, b: 0.3, a: 1.0 });

        let bad = serde_json::from_str::<Rgba>(r#"{"r":2.0,"g":0.2,"b":0.3,"a":1.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn parse_defaults_alpha() {
        assert_eq!(Rgba::parse("0.2, 0.4,0.6").unwrap(), Rgba { r: 0.2, g: 0.4, b: 0.6, a: 1.0 });
        assert!(Rgba::parse("0.2,0.4").is_err());
        assert!(Rgba::parse("red").is_err());
    }
}
