//! Chord symbol transposition (`C#m7/G#` → `D#m7/A#`)
//!
//! Only the root and the bass after `/` are pitches; the quality between them
//! is kept verbatim. Symbols written with `♯`/`♭` keep that style.

use once_cell::sync::Lazy;
use regex::Regex;

use super::interval::{Interval, TransPitch};
use crate::models::pitch::{Accidental, PitchName};

static HARM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<root>[A-G])(?P<raccid>bb|##|b|#|x|♭|♯|𝄪|𝄫)?(?P<quality>.*?)(?:/(?P<bass>[A-G])(?P<baccid>bb|##|b|#|x|♭|♯|𝄪|𝄫)?)?$",
    )
    .expect("valid harm regex")
});

fn spell(letter: &str, accid: Option<&str>, interval: Interval, unicode: bool) -> Option<String> {
    let pname = letter.chars().next().and_then(PitchName::from_letter)?;
    let alter = match accid {
        Some(symbol) => Accidental::from_symbol(symbol)?.alteration(),
        None => 0,
    };
    let pitch = TransPitch::new(pname, alter, 4).transpose(interval);
    let accid = Accidental::from_alteration(pitch.alter)?;
    let symbol = if unicode {
        accid.unicode_symbol()
    } else {
        accid.symbol()
    };
    Some(format!("{}{}", pitch.pname.letter(), symbol))
}

/// Transposed chord symbol, or `None` when the text is not a chord symbol
pub fn transpose_harm_text(text: &str, interval: Interval) -> Option<String> {
    let caps = HARM_RE.captures(text.trim())?;
    let unicode = text.contains(['♯', '♭', '𝄪', '𝄫']);

    let root = spell(
        &caps["root"],
        caps.name("raccid").map(|m| m.as_str()),
        interval,
        unicode,
    )?;
    let quality = caps.name("quality").map_or("", |m| m.as_str());
    let mut out = format!("{}{}", root, quality);

    if let Some(bass) = caps.name("bass") {
        let bass = spell(
            bass.as_str(),
            caps.name("baccid").map(|m| m.as_str()),
            interval,
            unicode,
        )?;
        out.push('/');
        out.push_str(&bass);
    }
    Some(out)
}
