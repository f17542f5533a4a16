//! Weather suitability bands and the catalog filter built on them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Lower bound (inclusive) of the `hot` band, in degrees Celsius.
pub const HOT_MIN_CELSIUS: f64 = 30.0;
/// Lower bound (inclusive) of the `cool` band, in degrees Celsius.
pub const COOL_MIN_CELSIUS: f64 = 25.0;

/// Weather category a product is tagged as appropriate for.
///
/// `All` is the wildcard tag; [`band_for_temperature`] never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    Hot,
    Cool,
    Cold,
    All,
}

impl Suitability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Suitability::Hot => "hot",
            Suitability::Cool => "cool",
            Suitability::Cold => "cold",
            Suitability::All => "all",
        }
    }
}

impl std::fmt::Display for Suitability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suitability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Suitability::Hot),
            "cool" => Ok(Suitability::Cool),
            "cold" => Ok(Suitability::Cold),
            "all" => Ok(Suitability::All),
            other => Err(CoreError::InvalidEnumValue {
                kind: "weather suitability",
                value: other.to_string(),
            }),
        }
    }
}

/// Maps a temperature in °C to its band.
///
/// Both thresholds are inclusive lower bounds: exactly 30 is `Hot`, exactly 25 is `Cool`.
#[must_use]
pub fn band_for_temperature(celsius: f64) -> Suitability {
    if celsius >= HOT_MIN_CELSIUS {
        Suitability::Hot
    } else if celsius >= COOL_MIN_CELSIUS {
        Suitability::Cool
    } else {
        Suitability::Cold
    }
}

/// A product tagged `tag` belongs in a view for `band` iff the tags match or
/// the product is tagged with the wildcard.
#[must_use]
pub fn is_suitable(tag: Suitability, band: Suitability) -> bool {
    tag == band || tag == Suitability::All
}

/// Current conditions for a location, from the live provider or a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub humidity: u8,
    /// Human-readable description, e.g. `"Cerah Berawan"`.
    pub condition: String,
    /// Stable identifier: `sunny`, `cloudy`, `rainy`, or `cool`.
    pub condition_id: String,
}

impl WeatherReading {
    #[must_use]
    pub fn band(&self) -> Suitability {
        band_for_temperature(self.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_inclusive_lower_bounds() {
        assert_eq!(band_for_temperature(30.0), Suitability::Hot);
        assert_eq!(band_for_temperature(25.0), Suitability::Cool);
        assert_eq!(band_for_temperature(29.99), Suitability::Cool);
        assert_eq!(band_for_temperature(24.99), Suitability::Cold);
    }

    #[test]
    fn band_covers_extremes() {
        assert_eq!(band_for_temperature(42.0), Suitability::Hot);
        assert_eq!(band_for_temperature(-3.0), Suitability::Cold);
    }

    #[test]
    fn band_matches_definition_across_a_sweep() {
        let mut t = -10.0;
        while t <= 45.0 {
            let expected = if t >= 30.0 {
                Suitability::Hot
            } else if t >= 25.0 {
                Suitability::Cool
            } else {
                Suitability::Cold
            };
            assert_eq!(band_for_temperature(t), expected, "temperature {t}");
            t += 0.25;
        }
    }

    #[test]
    fn suitability_matches_band_or_wildcard() {
        let tags = [
            Suitability::Hot,
            Suitability::Cool,
            Suitability::Cold,
            Suitability::All,
        ];
        for band in [Suitability::Hot, Suitability::Cool, Suitability::Cold] {
            for tag in tags {
                let expected = tag == band || tag == Suitability::All;
                assert_eq!(is_suitable(tag, band), expected, "tag {tag} band {band}");
            }
        }
    }

    #[test]
    fn suitability_parses_and_serializes_lowercase() {
        assert_eq!("cool".parse::<Suitability>().unwrap(), Suitability::Cool);
        assert!("panas".parse::<Suitability>().is_err());
        let json = serde_json::to_string(&Suitability::All).unwrap();
        assert_eq!(json, "\"all\"");
    }

    #[test]
    fn reading_band_uses_temperature() {
        let reading = WeatherReading {
            temperature: 28.0,
            humidity: 80,
            condition: "Berawan".to_string(),
            condition_id: "cloudy".to_string(),
        };
        assert_eq!(reading.band(), Suitability::Cool);
    }
}
