//! Transposition requests
//!
//! Three spellings are accepted, tried in this order:
//!
//! - an interval: `M2`, `-m3`, `+P8`, `AA4`, `m10`
//! - a number of semitones: `-3`, `+7`
//! - a major key tonic to move to: `Bb`, `-F#`, `+Eb`
//!
//! Semitones and tonics depend on the key of the score and are resolved
//! against it once that key is known.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::interval::{Interval, Quality, TransPitch};
use crate::models::pitch::{major_tonic, Accidental, PitchName};

static INTERVAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-]?)(P|M|m|A{1,2}|d{1,2})(\d+)$").expect("valid interval regex"));

static SEMITONES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-]?)(\d+)$").expect("valid semitones regex"));

/// Largest semitone request accepted (beyond the MIDI range is not music)
const MAX_SEMITONES: i32 = 127;

/// Largest interval number accepted (a compound interval of fourteen octaves)
const MAX_INTERVAL_NUMBER: u32 = 99;

static TONIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?)([A-Ga-g])(#{1,2}|b{1,2}|s{1,2}|f{1,2}|x|n)?$").expect("valid tonic regex")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranspositionError {
    #[error("Empty transposition request")]
    Empty,

    #[error("Cannot parse transposition request '{0}'")]
    Unparseable(String),

    #[error("Invalid interval '{0}'")]
    InvalidInterval(String),
}

/// Direction of a key-tonic request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    /// Whichever is closer
    Nearest,
}

impl Direction {
    fn from_sign(sign: &str) -> Self {
        match sign {
            "+" => Direction::Up,
            "-" => Direction::Down,
            _ => Direction::Nearest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranspositionRequest {
    Interval(Interval),
    Semitones(i32),
    KeyTonic {
        pname: PitchName,
        alteration: i32,
        direction: Direction,
    },
}

impl TranspositionRequest {
    /// Interval for a score in `key_fifths`, whose tonic is `tonic` when encoded
    ///
    /// `previous_fifths` is the key before the score was last transposed; a
    /// semitone request that leads back to it keeps its spelling.
    ///
    /// `None` when a tonic request meets a key with no nameable tonic
    /// (more than seven accidentals and no explicit tonic).
    pub fn resolve(
        &self,
        key_fifths: i32,
        tonic: Option<(PitchName, i32)>,
        previous_fifths: Option<i32>,
    ) -> Option<Interval> {
        match *self {
            TranspositionRequest::Interval(interval) => Some(interval),
            TranspositionRequest::Semitones(semitones) => {
                Some(Interval::for_semitones(semitones, key_fifths, previous_fifths))
            }
            TranspositionRequest::KeyTonic {
                pname,
                alteration,
                direction,
            } => {
                let (from_pname, from_alteration) = match tonic {
                    Some(tonic) => tonic,
                    None if key_fifths.abs() <= 7 => major_tonic(key_fifths),
                    None => return None,
                };
                let from = TransPitch::new(from_pname, from_alteration, 4);
                let to = TransPitch::new(pname, alteration, 4);
                Some(tonic_interval(from.interval_to(&to), direction))
            }
        }
    }
}

/// Pick the upward or downward form of an interval within one octave
fn tonic_interval(within_octave: Interval, direction: Direction) -> Interval {
    let up = if within_octave.diatonic < 0 {
        Interval::new(within_octave.diatonic + 7, within_octave.chromatic + 12)
    } else {
        within_octave
    };
    if up.is_unison() {
        return up;
    }
    let down = Interval::new(up.diatonic - 7, up.chromatic - 12);
    match direction {
        Direction::Up => up,
        Direction::Down => down,
        Direction::Nearest if down.chromatic.abs() < up.chromatic.abs() => down,
        Direction::Nearest => up,
    }
}

impl FromStr for TranspositionRequest {
    type Err = TranspositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TranspositionError::Empty);
        }

        if let Some(caps) = INTERVAL_RE.captures(s) {
            let descending = &caps[1] == "-";
            let quality = match &caps[2] {
                "P" => Quality::Perfect,
                "M" => Quality::Major,
                "m" => Quality::Minor,
                augmented if augmented.starts_with('A') => Quality::Augmented(augmented.len() as u8),
                diminished => Quality::Diminished(diminished.len() as u8),
            };
            let number: u32 = caps[3]
                .parse()
                .ok()
                .filter(|&n| n <= MAX_INTERVAL_NUMBER)
                .ok_or_else(|| TranspositionError::InvalidInterval(s.to_string()))?;
            return Interval::from_quality(quality, number, descending)
                .map(TranspositionRequest::Interval)
                .ok_or_else(|| TranspositionError::InvalidInterval(s.to_string()));
        }

        if let Some(caps) = SEMITONES_RE.captures(s) {
            let magnitude: i32 = caps[2]
                .parse()
                .ok()
                .filter(|&n| n <= MAX_SEMITONES)
                .ok_or_else(|| TranspositionError::InvalidInterval(s.to_string()))?;
            let semitones = if &caps[1] == "-" { -magnitude } else { magnitude };
            return Ok(TranspositionRequest::Semitones(semitones));
        }

        if let Some(caps) = TONIC_RE.captures(s) {
            let letter = caps[2].chars().next().unwrap_or('C');
            let pname = PitchName::from_letter(letter)
                .ok_or_else(|| TranspositionError::Unparseable(s.to_string()))?;
            let alteration = match caps.get(3).map(|m| m.as_str()) {
                None => 0,
                Some(accid) => Accidental::from_symbol(accid)
                    .map(Accidental::alteration)
                    .ok_or_else(|| TranspositionError::Unparseable(s.to_string()))?,
            };
            return Ok(TranspositionRequest::KeyTonic {
                pname,
                alteration,
                direction: Direction::from_sign(&caps[1]),
            });
        }

        Err(TranspositionError::Unparseable(s.to_string()))
    }
}

impl fmt::Display for TranspositionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranspositionRequest::Interval(interval) => write!(f, "{}", interval),
            TranspositionRequest::Semitones(semitones) => write!(f, "{:+}", semitones),
            TranspositionRequest::KeyTonic {
                pname,
                alteration,
                direction,
            } => {
                let sign = match direction {
                    Direction::Up => "+",
                    Direction::Down => "-",
                    Direction::Nearest => "",
                };
                let accid = Accidental::from_alteration(*alteration)
                    .map(Accidental::symbol)
                    .unwrap_or("");
                write!(f, "{}{}{}", sign, pname.letter(), accid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> TranspositionRequest {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_intervals() {
        assert_eq!(parse("M2"), TranspositionRequest::Interval(Interval::new(1, 2)));
        assert_eq!(parse("-m3"), TranspositionRequest::Interval(Interval::new(-2, -3)));
        assert_eq!(parse("+P8"), TranspositionRequest::Interval(Interval::new(7, 12)));
        assert_eq!(parse("AA4"), TranspositionRequest::Interval(Interval::new(3, 7)));
        assert_eq!(parse("dd5"), TranspositionRequest::Interval(Interval::new(4, 5)));
        assert_eq!(parse("m10"), TranspositionRequest::Interval(Interval::new(9, 15)));
    }

    #[test]
    fn test_parse_semitones_and_tonics() {
        assert_eq!(parse("-3"), TranspositionRequest::Semitones(-3));
        assert_eq!(parse("+7"), TranspositionRequest::Semitones(7));
        assert_eq!(parse("0"), TranspositionRequest::Semitones(0));
        assert_eq!(
            parse("Bb"),
            TranspositionRequest::KeyTonic {
                pname: PitchName::B,
                alteration: -1,
                direction: Direction::Nearest
            }
        );
        assert_eq!(
            parse("-F#"),
            TranspositionRequest::KeyTonic {
                pname: PitchName::F,
                alteration: 1,
                direction: Direction::Down
            }
        );
        assert_eq!(
            parse("ess"),
            TranspositionRequest::KeyTonic {
                pname: PitchName::E,
                alteration: 2,
                direction: Direction::Nearest
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<TranspositionRequest>(), Err(TranspositionError::Empty));
        assert_eq!(
            "M5".parse::<TranspositionRequest>(),
            Err(TranspositionError::InvalidInterval("M5".to_string()))
        );
        assert_eq!(
            "P0".parse::<TranspositionRequest>(),
            Err(TranspositionError::InvalidInterval("P0".to_string()))
        );
        assert_eq!(
            "H#".parse::<TranspositionRequest>(),
            Err(TranspositionError::Unparseable("H#".to_string()))
        );
    }

    #[test]
    fn test_oversized_requests_are_rejected() {
        for request in ["2000000000", "-128", "99999999999", "P100", "M4294967298"] {
            assert_eq!(
                request.parse::<TranspositionRequest>(),
                Err(TranspositionError::InvalidInterval(request.to_string())),
                "{}",
                request
            );
        }
        assert_eq!(parse("-127"), TranspositionRequest::Semitones(-127));
        assert_eq!(parse("P99"), TranspositionRequest::Interval(Interval::new(98, 168)));
    }

    #[test]
    fn test_tonic_resolution() {
        // C major to Bb: nearest is down a major second
        assert_eq!(parse("Bb").resolve(0, None, None), Some(Interval::new(-1, -2)));
        assert_eq!(parse("+Bb").resolve(0, None, None), Some(Interval::new(6, 10)));
        // D major to F: up a minor third
        assert_eq!(parse("F").resolve(2, None, None), Some(Interval::new(2, 3)));
        // explicit tonic wins over the signature
        assert_eq!(parse("D").resolve(-3, Some((PitchName::C, 0)), None), Some(Interval::new(1, 2)));
        assert_eq!(parse("C").resolve(0, None, None), Some(Interval::UNISON));
        // no tonic for nine sharps
        assert_eq!(parse("C").resolve(9, None, None), None);
    }

    #[test]
    fn test_semitone_resolution_depends_on_key() {
        let request = parse("1");
        assert_eq!(request.resolve(0, None, None), Some(Interval::new(1, 1)));
        assert_eq!(request.resolve(-5, None, None), Some(Interval::new(0, 1)));
        // back from G major to the F# major it came from
        assert_eq!(parse("-1").resolve(1, None, Some(6)), Some(Interval::new(-1, -1)));
        assert_eq!(parse("-1").resolve(1, None, None), Some(Interval::new(0, -1)));
    }
}
