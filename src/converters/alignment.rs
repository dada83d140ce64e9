//! Barline positions of an unmeasured measure
//!
//! Onsets are sums of the durations of preceding layer elements. A boundary
//! is a position strictly inside the content where every participating staff
//! has a barline.

use std::collections::{BTreeMap, BTreeSet};

use num_rational::Ratio;

use crate::models::{Document, NodeId, NodeKind, Time};

/// Duration of a layer element in whole notes
///
/// Chords without their own duration take the longest note; ligatures last
/// as long as their notes together. Everything else takes no time.
pub fn element_duration(doc: &Document, id: NodeId) -> Time {
    match doc.kind(id) {
        NodeKind::Note(note) => note.dur.unwrap_or_else(zero),
        NodeKind::Rest(rest) => rest.dur.unwrap_or_else(zero),
        NodeKind::Chord(chord) => chord.dur.unwrap_or_else(|| {
            doc.children(id)
                .iter()
                .map(|&c| element_duration(doc, c))
                .max()
                .unwrap_or_else(zero)
        }),
        NodeKind::Ligature => doc
            .children(id)
            .iter()
            .map(|&c| element_duration(doc, c))
            .fold(zero(), |acc, d| acc + d),
        _ => zero(),
    }
}

fn zero() -> Time {
    Ratio::from_integer(0)
}

/// Barlines of one staff, over all of its layers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffBarLines {
    pub onsets: BTreeSet<Time>,
    pub content_end: Time,
}

/// Per-staff barline onsets of one measure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarLineAlignment {
    staves: BTreeMap<i32, StaffBarLines>,
}

impl BarLineAlignment {
    pub fn from_measure(doc: &Document, measure: NodeId) -> Self {
        let mut staves: BTreeMap<i32, StaffBarLines> = BTreeMap::new();
        for &staff in doc.children(measure) {
            let Some(staff_n) = doc.kind(staff).staff_n() else {
                continue;
            };
            let entry = staves.entry(staff_n).or_default();
            for &layer in doc.children(staff) {
                if doc.kind(layer).layer_n().is_none() {
                    continue;
                }
                let mut onset = zero();
                for &element in doc.children(layer) {
                    if matches!(doc.kind(element), NodeKind::BarLine(_)) {
                        entry.onsets.insert(onset);
                    }
                    onset += element_duration(doc, element);
                }
                entry.content_end = entry.content_end.max(onset);
            }
        }
        Self { staves }
    }

    pub fn staff(&self, staff_n: i32) -> Option<&StaffBarLines> {
        self.staves.get(&staff_n)
    }

    /// End of the longest layer
    pub fn content_end(&self) -> Time {
        self.staves
            .values()
            .map(|s| s.content_end)
            .max()
            .unwrap_or_else(zero)
    }

    /// Positions shared by the barlines of every registered staff present
    ///
    /// Registered staves missing from the measure do not take part. With none
    /// present there is no boundary at all.
    pub fn boundaries(&self, registered: &BTreeSet<i32>) -> Vec<Time> {
        let present: Vec<&StaffBarLines> = registered
            .iter()
            .filter_map(|n| self.staves.get(n))
            .collect();
        let Some((first, rest)) = present.split_first() else {
            return Vec::new();
        };
        let end = self.content_end();
        first
            .onsets
            .iter()
            .copied()
            .filter(|&p| p > zero() && p < end)
            .filter(|p| rest.iter().all(|s| s.onsets.contains(p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarLine, Chord, Layer, Measure, Note, PitchName, Rest, Staff};

    fn t(n: i64) -> Time {
        Ratio::from_integer(n)
    }

    /// One layer per staff: notes of the given lengths, barline after each but the last
    fn measure_with(doc: &mut Document, staves: &[(i32, &[i64])]) -> NodeId {
        let measure = doc.append(doc.root(), NodeKind::Measure(Measure::unmeasured()));
        for &(n, lengths) in staves {
            let staff = doc.append(measure, NodeKind::Staff(Staff { n }));
            let layer = doc.append(staff, NodeKind::Layer(Layer { n: 1 }));
            for (i, &len) in lengths.iter().enumerate() {
                if i > 0 {
                    doc.append(layer, NodeKind::BarLine(BarLine::default()));
                }
                doc.append(layer, NodeKind::Note(Note::new(PitchName::C, 4).with_dur(t(len))));
            }
        }
        measure
    }

    #[test]
    fn test_boundary_needs_every_registered_staff() {
        let mut doc = Document::new();
        let measure = measure_with(&mut doc, &[(1, &[10, 10, 10][..]), (2, &[10, 15, 5][..])]);
        let alignment = BarLineAlignment::from_measure(&doc, measure);

        let registered = BTreeSet::from([1, 2]);
        assert_eq!(alignment.boundaries(&registered), vec![t(10)]);

        let only_first = BTreeSet::from([1]);
        assert_eq!(alignment.boundaries(&only_first), vec![t(10), t(20)]);
    }

    #[test]
    fn test_absent_registered_staff_never_blocks() {
        let mut doc = Document::new();
        let measure = measure_with(&mut doc, &[(1, &[2, 2][..])]);
        let alignment = BarLineAlignment::from_measure(&doc, measure);

        assert_eq!(alignment.boundaries(&BTreeSet::from([1, 3])), vec![t(2)]);
        assert!(alignment.boundaries(&BTreeSet::from([3])).is_empty());
    }

    #[test]
    fn test_barlines_at_edges_are_not_boundaries() {
        let mut doc = Document::new();
        let measure = doc.append(doc.root(), NodeKind::Measure(Measure::unmeasured()));
        let staff = doc.append(measure, NodeKind::Staff(Staff { n: 1 }));
        let layer = doc.append(staff, NodeKind::Layer(Layer { n: 1 }));
        doc.append(layer, NodeKind::BarLine(BarLine::default()));
        doc.append(layer, NodeKind::Rest(Rest { dur: Some(t(3)), ..Default::default() }));
        doc.append(layer, NodeKind::BarLine(BarLine::default()));

        let alignment = BarLineAlignment::from_measure(&doc, measure);
        assert_eq!(alignment.content_end(), t(3));
        assert!(alignment.boundaries(&BTreeSet::from([1])).is_empty());
    }

    #[test]
    fn test_chord_and_ligature_durations() {
        let mut doc = Document::new();
        let chord = doc.append(doc.root(), NodeKind::Chord(Chord::default()));
        doc.append(chord, NodeKind::Note(Note::new(PitchName::C, 4).with_dur(t(2))));
        doc.append(chord, NodeKind::Note(Note::new(PitchName::E, 4).with_dur(t(3))));
        assert_eq!(element_duration(&doc, chord), t(3));

        let ligature = doc.append(doc.root(), NodeKind::Ligature);
        doc.append(ligature, NodeKind::Note(Note::new(PitchName::C, 4).with_dur(t(2))));
        doc.append(ligature, NodeKind::Note(Note::new(PitchName::D, 4).with_dur(Ratio::new(1, 2))));
        assert_eq!(element_duration(&doc, ligature), Ratio::new(5, 2));
    }
}
