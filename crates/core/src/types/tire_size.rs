//! Tire size designations (`225/45R17`).
//!
//! Shoppers type sizes in many shapes: `225/45R17`, `p225/45zr17`,
//! `225 45 17`, `225-45-17`. The size search parses whatever they typed into
//! a [`TireSizeSpec`] and redirects to the canonical form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a tire size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TireSizeError {
    #[error("tire size is empty")]
    Empty,
    #[error("expected {0} in tire size")]
    Expected(&'static str),
    #[error("{field} {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u16,
        min: u16,
        max: u16,
    },
    #[error("unexpected trailing text: {0}")]
    Trailing(String),
}

/// Service-type prefix on a metric size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizePrefix {
    /// Passenger (`P225/45R17`).
    P,
    /// Light truck (`LT265/75R16`).
    Lt,
    /// Special trailer (`ST205/75R15`).
    St,
}

impl SizePrefix {
    const fn as_str(self) -> &'static str {
        match self {
            Self::P => "P",
            Self::Lt => "LT",
            Self::St => "ST",
        }
    }
}

/// A parsed metric tire size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TireSizeSpec {
    pub prefix: Option<SizePrefix>,
    /// Section width in millimetres.
    pub width: u16,
    /// Sidewall height as a percentage of width.
    pub aspect_ratio: u16,
    /// Construction code: `R`, `ZR`, `D` or `B`.
    pub construction: String,
    /// Rim diameter in inches.
    pub rim_diameter: u16,
}

impl TireSizeSpec {
    /// Canonical search key without prefix, e.g. `225/45R17`.
    #[must_use]
    pub fn search_key(&self) -> String {
        format!(
            "{}/{}R{}",
            self.width, self.aspect_ratio, self.rim_diameter
        )
    }
}

impl fmt::Display for TireSizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.prefix {
            f.write_str(prefix.as_str())?;
        }
        write!(
            f,
            "{}/{}{}{}",
            self.width, self.aspect_ratio, self.construction, self.rim_diameter
        )
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn eat_prefix(&mut self, prefix: &str) -> bool {
        match self.rest.strip_prefix(prefix) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn skip_separators(&mut self) {
        self.rest = self.rest.trim_start_matches(['/', ' ', '-']);
    }

    fn number(&mut self, what: &'static str) -> Result<u16, TireSizeError> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, rest) = self.rest.split_at(end);
        let value = digits
            .parse::<u16>()
            .map_err(|_| TireSizeError::Expected(what))?;
        self.rest = rest;
        Ok(value)
    }

    fn letters(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest.len());
        let (letters, rest) = self.rest.split_at(end);
        self.rest = rest;
        letters
    }
}

fn check_range(field: &'static str, value: u16, min: u16, max: u16) -> Result<u16, TireSizeError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(TireSizeError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl FromStr for TireSizeSpec {
    type Err = TireSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(TireSizeError::Empty);
        }
        let mut cursor = Cursor { rest: &upper };

        let prefix = if cursor.eat_prefix("LT") {
            Some(SizePrefix::Lt)
        } else if cursor.eat_prefix("ST") {
            Some(SizePrefix::St)
        } else if cursor.eat_prefix("P") {
            Some(SizePrefix::P)
        } else {
            None
        };

        let width = check_range("width", cursor.number("section width")?, 105, 405)?;
        cursor.skip_separators();
        let aspect_ratio = check_range("aspect ratio", cursor.number("aspect ratio")?, 20, 95)?;
        cursor.skip_separators();

        let construction = match cursor.letters() {
            "" | "R" => "R",
            "ZR" => "ZR",
            "D" => "D",
            "B" => "B",
            _ => return Err(TireSizeError::Expected("construction code R, ZR, D or B")),
        }
        .to_string();
        cursor.skip_separators();

        let rim_diameter = check_range("rim diameter", cursor.number("rim diameter")?, 10, 30)?;

        // Load index / speed rating may follow after whitespace ("94W")
        let trailing = cursor.rest.trim();
        if !trailing.is_empty() && !cursor.rest.starts_with(' ') {
            return Err(TireSizeError::Trailing(trailing.to_string()));
        }

        Ok(Self {
            prefix,
            width,
            aspect_ratio,
            construction,
            rim_diameter,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(s: &str) -> TireSizeSpec {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_common_shapes() {
        for input in ["225/45R17", "225/45r17", "225 45 17", "225-45-17", "225/45/17"] {
            let size = parse(input);
            assert_eq!(size.width, 225, "{input}");
            assert_eq!(size.aspect_ratio, 45, "{input}");
            assert_eq!(size.rim_diameter, 17, "{input}");
            assert_eq!(size.search_key(), "225/45R17", "{input}");
        }
    }

    #[test]
    fn test_parse_prefix_and_construction() {
        let size = parse("p245/40zr18");
        assert_eq!(size.prefix, Some(SizePrefix::P));
        assert_eq!(size.construction, "ZR");
        assert_eq!(size.to_string(), "P245/40ZR18");

        let size = parse("LT265/75R16");
        assert_eq!(size.prefix, Some(SizePrefix::Lt));
        assert_eq!(size.to_string(), "LT265/75R16");
    }

    #[test]
    fn test_parse_ignores_service_description() {
        assert_eq!(parse("225/45R17 94W").search_key(), "225/45R17");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<TireSizeSpec>(), Err(TireSizeError::Empty));
        assert!(matches!(
            "225/45X17".parse::<TireSizeSpec>(),
            Err(TireSizeError::Expected(_))
        ));
        assert!(matches!(
            "225/45R45".parse::<TireSizeSpec>(),
            Err(TireSizeError::OutOfRange { field: "rim diameter", .. })
        ));
        assert!(matches!(
            "225/45R17XL".parse::<TireSizeSpec>(),
            Err(TireSizeError::Trailing(_))
        ));
    }
}
