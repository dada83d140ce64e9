//! Interval arithmetic in diatonic steps and semitones
//!
//! An interval is a pair `(diatonic, chromatic)`: a major third is `(2, 4)`,
//! a diminished fourth `(3, 4)`. Keeping both parts is what lets a
//! transposition spell its result (E vs. Fb) instead of guessing.

use std::fmt;

use crate::models::pitch::{major_tonic, PitchName};

/// Semitones of the major/perfect interval for each simple diatonic size
const NATURAL_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Semitones spanned by the major or perfect interval of `diatonic` steps
fn natural_semitones(diatonic: i32) -> i32 {
    12 * diatonic.div_euclid(7) + NATURAL_SEMITONES[diatonic.rem_euclid(7) as usize]
}

/// Unisons, fourths and fifths (and their compounds)
fn is_perfect(diatonic: i32) -> bool {
    matches!(diatonic.rem_euclid(7), 0 | 3 | 4)
}

/// Interval quality, with the multiplicity of augmented/diminished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Perfect,
    Major,
    Minor,
    Augmented(u8),
    Diminished(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub diatonic: i32,
    pub chromatic: i32,
}

impl Interval {
    pub const UNISON: Interval = Interval {
        diatonic: 0,
        chromatic: 0,
    };

    pub fn new(diatonic: i32, chromatic: i32) -> Self {
        Self {
            diatonic,
            chromatic,
        }
    }

    /// Build from a quality and an interval number (1 = unison, 8 = octave)
    ///
    /// Returns `None` for number 0 and for qualities the size cannot take
    /// (a major fifth, a perfect third).
    pub fn from_quality(quality: Quality, number: u32, descending: bool) -> Option<Interval> {
        if number == 0 {
            return None;
        }
        let diatonic = number as i32 - 1;
        let perfect = is_perfect(diatonic);
        let alteration = match quality {
            Quality::Perfect if perfect => 0,
            Quality::Major if !perfect => 0,
            Quality::Minor if !perfect => -1,
            Quality::Augmented(count) => i32::from(count),
            Quality::Diminished(count) if perfect => -i32::from(count),
            Quality::Diminished(count) => -i32::from(count) - 1,
            _ => return None,
        };
        let interval = Interval::new(diatonic, natural_semitones(diatonic) + alteration);
        Some(if descending { interval.inverse() } else { interval })
    }

    /// Spellings of a semitone distance, from the smallest diatonic size up
    ///
    /// Perfect sizes take diminished to augmented, the others diminished to
    /// augmented through minor and major.
    pub fn candidates(semitones: i32) -> Vec<Interval> {
        if semitones < 0 {
            return Self::candidates(-semitones)
                .into_iter()
                .map(Interval::inverse)
                .collect();
        }
        let approx = semitones * 7 / 12;
        (approx - 2..=approx + 2)
            .filter(|&d| d >= 0)
            .filter_map(|d| {
                let alteration = semitones - natural_semitones(d);
                let allowed = if is_perfect(d) { -1..=1 } else { -2..=1 };
                allowed
                    .contains(&alteration)
                    .then(|| Interval::new(d, semitones))
            })
            .collect()
    }

    /// The spelling of `semitones` that leaves a key of `key_fifths` with the
    /// fewest accidentals; ties go to the smaller alteration, then the earlier candidate
    ///
    /// A spelling that lands on `previous_fifths` wins outright, so that
    /// undoing a transposition returns to the key it started from rather than
    /// to its enharmonic twin.
    pub fn for_semitones(semitones: i32, key_fifths: i32, previous_fifths: Option<i32>) -> Interval {
        Self::candidates(semitones)
            .into_iter()
            .min_by_key(|i| {
                let target = key_fifths + i.fifths();
                (
                    previous_fifths != Some(target),
                    target.abs(),
                    i.alteration().abs(),
                )
            })
            .unwrap_or(Interval::new(0, semitones))
    }

    /// Displacement on the circle of fifths
    pub fn fifths(&self) -> i32 {
        7 * self.chromatic - 12 * self.diatonic
    }

    /// Semitones away from the major/perfect interval of the same size
    pub fn alteration(&self) -> i32 {
        if self.diatonic >= 0 {
            self.chromatic - natural_semitones(self.diatonic)
        } else {
            -self.chromatic - natural_semitones(-self.diatonic)
        }
    }

    pub fn inverse(self) -> Interval {
        Interval::new(-self.diatonic, -self.chromatic)
    }

    pub fn is_unison(&self) -> bool {
        *self == Interval::UNISON
    }

    /// Transposed key signature, respelled by twelve fifths past seven accidentals
    ///
    /// When the result is enharmonic to `previous_fifths`, that spelling is kept.
    pub fn transpose_key_fifths(&self, fifths: i32, previous_fifths: Option<i32>) -> i32 {
        let mut transposed = fifths + self.fifths();
        if let Some(previous) = previous_fifths {
            if previous.abs() <= 7 && (previous - transposed).rem_euclid(12) == 0 {
                return previous;
            }
        }
        while transposed > 7 {
            transposed -= 12;
        }
        while transposed < -7 {
            transposed += 12;
        }
        transposed
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descending = self.diatonic < 0 || (self.diatonic == 0 && self.chromatic < 0);
        let size = self.diatonic.abs();
        let alteration = if descending {
            self.inverse().alteration()
        } else {
            self.alteration()
        };
        let perfect = is_perfect(size);
        let quality = match alteration {
            0 if perfect => "P".to_string(),
            0 => "M".to_string(),
            -1 if !perfect => "m".to_string(),
            a if a > 0 => "A".repeat(a as usize),
            a if perfect => "d".repeat(-a as usize),
            a => "d".repeat((-a - 1) as usize),
        };
        let sign = if descending { "-" } else { "" };
        write!(f, "{}{}{}", sign, quality, size + 1)
    }
}

/// A spelled pitch: letter, alteration and octave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransPitch {
    pub pname: PitchName,
    pub alter: i32,
    pub oct: i32,
}

impl TransPitch {
    pub fn new(pname: PitchName, alter: i32, oct: i32) -> Self {
        Self { pname, alter, oct }
    }

    /// Diatonic steps above C0
    fn step(&self) -> i32 {
        7 * self.oct + self.pname.index()
    }

    /// Semitones above C0
    pub fn semitones(&self) -> i32 {
        natural_semitones(self.step()) + self.alter
    }

    fn from_step(step: i32, semitones: i32) -> Self {
        Self {
            pname: PitchName::from_index(step),
            alter: semitones - natural_semitones(step),
            oct: step.div_euclid(7),
        }
    }

    /// Move by `interval`; results beyond a double accidental are respelled
    pub fn transpose(&self, interval: Interval) -> TransPitch {
        let step = self.step() + interval.diatonic;
        let semitones = self.semitones() + interval.chromatic;
        let pitch = Self::from_step(step, semitones);
        if pitch.alter.abs() <= 2 {
            return pitch;
        }
        (-3..=3)
            .map(|delta| Self::from_step(step + delta, semitones))
            .min_by_key(|p| (p.alter.abs(), (p.step() - step).abs()))
            .unwrap_or(pitch)
    }

    /// Interval from `self` up or down to `other`
    pub fn interval_to(&self, other: &TransPitch) -> Interval {
        Interval::new(other.step() - self.step(), other.semitones() - self.semitones())
    }
}

/// Tonic of a key, moved together with its signature
///
/// `old_fifths` and `new_fifths` are the signature before and after; the
/// tonic shifts by the same number of fifths.
pub fn transpose_tonic(pname: PitchName, alter: i32, old_fifths: i32, new_fifths: i32) -> (PitchName, i32) {
    let tonic_fifths = pname.fifths() + 7 * alter;
    major_tonic(tonic_fifths + new_fifths - old_fifths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_quality() {
        assert_eq!(Interval::from_quality(Quality::Major, 3, false), Some(Interval::new(2, 4)));
        assert_eq!(Interval::from_quality(Quality::Minor, 3, true), Some(Interval::new(-2, -3)));
        assert_eq!(Interval::from_quality(Quality::Perfect, 8, false), Some(Interval::new(7, 12)));
        assert_eq!(Interval::from_quality(Quality::Augmented(2), 4, false), Some(Interval::new(3, 7)));
        assert_eq!(Interval::from_quality(Quality::Diminished(1), 7, false), Some(Interval::new(6, 9)));
        assert_eq!(Interval::from_quality(Quality::Minor, 10, false), Some(Interval::new(9, 15)));
        assert_eq!(Interval::from_quality(Quality::Major, 5, false), None);
        assert_eq!(Interval::from_quality(Quality::Perfect, 0, false), None);
    }

    #[test]
    fn test_fifths_of_intervals() {
        assert_eq!(Interval::new(1, 2).fifths(), 2);
        assert_eq!(Interval::new(4, 7).fifths(), 1);
        assert_eq!(Interval::new(2, 3).fifths(), -3);
        assert_eq!(Interval::new(7, 12).fifths(), 0);
    }

    #[test]
    fn test_semitones_choose_fewest_accidentals() {
        // from C major, 3 semitones up is Eb major, not D# major
        assert_eq!(Interval::for_semitones(3, 0, None), Interval::new(2, 3));
        // from E major (4 sharps), 1 semitone up is F major rather than E# major
        assert_eq!(Interval::for_semitones(1, 4, None), Interval::new(1, 1));
        // from F major, 1 semitone down is E major rather than Fb major
        assert_eq!(Interval::for_semitones(-1, -1, None), Interval::new(-1, -1));
        assert_eq!(Interval::for_semitones(0, 3, None), Interval::UNISON);
        assert_eq!(Interval::for_semitones(-12, 0, None), Interval::new(-7, -12));
    }

    #[test]
    fn test_semitones_return_to_the_previous_key() {
        // F# major up a semitone is G major; back down lands on F# again, not Gb
        let up = Interval::for_semitones(1, 6, None);
        assert_eq!(up.transpose_key_fifths(6, None), 1);
        let down = Interval::for_semitones(-1, 1, Some(6));
        assert_eq!(down, up.inverse());
        assert_eq!(down.transpose_key_fifths(1, Some(6)), 6);

        // C# major: the return would otherwise prefer Db
        assert_eq!(Interval::for_semitones(-1, 2, None).transpose_key_fifths(2, None), -5);
        assert_eq!(Interval::for_semitones(-1, 2, Some(7)).transpose_key_fifths(2, Some(7)), 7);
    }

    #[test]
    fn test_semitone_choice_undoes_itself_in_every_key() {
        for key in -7..=7 {
            for semitones in (-24..=24).filter(|&s| s != 0) {
                let there = Interval::for_semitones(semitones, key, None);
                let reached = there.transpose_key_fifths(key, None);
                let back = Interval::for_semitones(-semitones, reached, Some(key));
                assert_eq!(back, there.inverse(), "key {} by {}", key, semitones);
                assert_eq!(back.transpose_key_fifths(reached, Some(key)), key);
            }
        }
    }

    #[test]
    fn test_transpose_pitch() {
        let c4 = TransPitch::new(PitchName::C, 0, 4);
        assert_eq!(c4.transpose(Interval::new(2, 4)), TransPitch::new(PitchName::E, 0, 4));
        assert_eq!(c4.transpose(Interval::new(-1, -2)), TransPitch::new(PitchName::B, -1, 3));

        let b3 = TransPitch::new(PitchName::B, 0, 3);
        assert_eq!(b3.transpose(Interval::new(1, 2)), TransPitch::new(PitchName::C, 1, 4));
    }

    #[test]
    fn test_triple_accidentals_are_respelled() {
        let f_double_sharp = TransPitch::new(PitchName::F, 2, 4);
        let result = f_double_sharp.transpose(Interval::new(0, 1));
        assert_eq!(result, TransPitch::new(PitchName::G, 1, 4));
        assert_eq!(result.semitones(), f_double_sharp.semitones() + 1);
    }

    #[test]
    fn test_key_fifths_respelled() {
        // B major up a minor second is C major, C# up an augmented unison would be 14 sharps
        assert_eq!(Interval::new(1, 1).transpose_key_fifths(5, None), 0);
        assert_eq!(Interval::new(0, 1).transpose_key_fifths(7, None), 2);
        assert_eq!(Interval::new(0, -1).transpose_key_fifths(-7, None), -2);
    }

    #[test]
    fn test_key_fifths_keep_previous_spelling() {
        // Cb major up a minor second is respelled to C; down again it is Cb, not B
        assert_eq!(Interval::new(1, 1).transpose_key_fifths(-7, None), 0);
        assert_eq!(Interval::new(-1, -1).transpose_key_fifths(0, None), 5);
        assert_eq!(Interval::new(-1, -1).transpose_key_fifths(0, Some(-7)), -7);
        // a previous key that is not enharmonic is ignored
        assert_eq!(Interval::new(1, 2).transpose_key_fifths(0, Some(-7)), 2);
    }

    #[test]
    fn test_tonic_follows_signature() {
        // A minor (0) up a major second to B minor (2)
        assert_eq!(transpose_tonic(PitchName::A, 0, 0, 2), (PitchName::B, 0));
        assert_eq!(transpose_tonic(PitchName::C, 0, 0, -3), (PitchName::E, -1));
    }

    #[test]
    fn test_interval_display() {
        assert_eq!(Interval::new(2, 4).to_string(), "M3");
        assert_eq!(Interval::new(-2, -3).to_string(), "-m3");
        assert_eq!(Interval::new(3, 6).to_string(), "A4");
        assert_eq!(Interval::new(4, 6).to_string(), "d5");
        assert_eq!(Interval::new(0, 0).to_string(), "P1");
    }
}
