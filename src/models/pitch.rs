//! Pitch primitives shared by the document model and the transposition engine
//!
//! Pitch names and accidentals use the MEI attribute spellings on the wire
//! (`pname="c"`, `accid="s"`), so a serialized tree reads like the markup it
//! was built from.

use serde::{Deserialize, Serialize};

/// Semitones above C for each natural pitch name
const NATURAL_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Position of each natural pitch name on the circle of fifths (C = 0)
const NATURAL_FIFTHS: [i32; 7] = [0, 2, 4, -1, 1, 3, 5];

/// Order in which sharps enter a key signature (F C G D A E B)
const SHARP_ORDER: [PitchName; 7] = [
    PitchName::F,
    PitchName::C,
    PitchName::G,
    PitchName::D,
    PitchName::A,
    PitchName::E,
    PitchName::B,
];

/// Diatonic pitch name (`@pname`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl PitchName {
    pub const ALL: [PitchName; 7] = [
        PitchName::C,
        PitchName::D,
        PitchName::E,
        PitchName::F,
        PitchName::G,
        PitchName::A,
        PitchName::B,
    ];

    /// Diatonic index, C = 0 .. B = 6
    pub fn index(self) -> i32 {
        match self {
            PitchName::C => 0,
            PitchName::D => 1,
            PitchName::E => 2,
            PitchName::F => 3,
            PitchName::G => 4,
            PitchName::A => 5,
            PitchName::B => 6,
        }
    }

    /// Inverse of [`PitchName::index`]; wraps any integer into the octave
    pub fn from_index(index: i32) -> PitchName {
        Self::ALL[index.rem_euclid(7) as usize]
    }

    /// Parse a letter name, case insensitive
    pub fn from_letter(letter: char) -> Option<PitchName> {
        match letter.to_ascii_uppercase() {
            'C' => Some(PitchName::C),
            'D' => Some(PitchName::D),
            'E' => Some(PitchName::E),
            'F' => Some(PitchName::F),
            'G' => Some(PitchName::G),
            'A' => Some(PitchName::A),
            'B' => Some(PitchName::B),
            _ => None,
        }
    }

    /// Upper-case letter used in chord symbols
    pub fn letter(self) -> char {
        match self {
            PitchName::C => 'C',
            PitchName::D => 'D',
            PitchName::E => 'E',
            PitchName::F => 'F',
            PitchName::G => 'G',
            PitchName::A => 'A',
            PitchName::B => 'B',
        }
    }

    /// Semitones above C of the natural pitch
    pub fn semitones(self) -> i32 {
        NATURAL_SEMITONES[self.index() as usize]
    }

    /// Circle-of-fifths position of the natural pitch
    pub fn fifths(self) -> i32 {
        NATURAL_FIFTHS[self.index() as usize]
    }
}

/// Accidental (`@accid` / `@accid.ges`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    #[serde(rename = "ff")]
    DoubleFlat,
    #[serde(rename = "f")]
    Flat,
    #[serde(rename = "n")]
    Natural,
    #[serde(rename = "s")]
    Sharp,
    #[serde(rename = "x")]
    DoubleSharp,
}

impl Accidental {
    /// Chromatic alteration in semitones
    pub fn alteration(self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    /// Accidental for an alteration; `None` beyond a double accidental
    pub fn from_alteration(alteration: i32) -> Option<Accidental> {
        match alteration {
            -2 => Some(Accidental::DoubleFlat),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            1 => Some(Accidental::Sharp),
            2 => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }

    /// Parse the spellings found in chord symbols and transposition requests
    pub fn from_symbol(symbol: &str) -> Option<Accidental> {
        match symbol {
            "" | "n" | "♮" => Some(Accidental::Natural),
            "#" | "s" | "♯" => Some(Accidental::Sharp),
            "##" | "ss" | "x" | "𝄪" => Some(Accidental::DoubleSharp),
            "b" | "f" | "♭" => Some(Accidental::Flat),
            "bb" | "ff" | "𝄫" => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }

    /// ASCII chord-symbol spelling
    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }

    /// Unicode chord-symbol spelling
    pub fn unicode_symbol(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "𝄫",
            Accidental::Flat => "♭",
            Accidental::Natural => "",
            Accidental::Sharp => "♯",
            Accidental::DoubleSharp => "𝄪",
        }
    }
}

/// Key mode (`@mode`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

/// Alteration a key signature of `fifths` applies to `pname`
///
/// Works beyond seven sharps or flats: the eighth sharp doubles F, and so on.
pub fn key_alteration(fifths: i32, pname: PitchName) -> i32 {
    if fifths == 0 {
        return 0;
    }
    let count = fifths.abs();
    let position = if fifths > 0 {
        SHARP_ORDER.iter().position(|&p| p == pname)
    } else {
        SHARP_ORDER.iter().rev().position(|&p| p == pname)
    }
    .unwrap_or(0) as i32;
    let alteration = count / 7 + i32::from(position < count % 7);
    fifths.signum() * alteration
}

/// Circle-of-fifths position of a major tonic
pub fn major_key_fifths(tonic: PitchName, alteration: i32) -> i32 {
    tonic.fifths() + 7 * alteration
}

/// Major tonic for a circle-of-fifths position
pub fn major_tonic(fifths: i32) -> (PitchName, i32) {
    for pname in PitchName::ALL {
        let diff = fifths - pname.fifths();
        if diff.rem_euclid(7) == 0 {
            return (pname, diff / 7);
        }
    }
    (PitchName::C, 0)
}
