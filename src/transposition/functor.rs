//! Transposition pass
//!
//! Notes, key signatures, chord symbols and positioned rests are rewritten
//! by an interval. The interval is either one request for the whole score
//! (literal mode) or, when normalising to sounding pitch, one per staff
//! taken from the `@trans.diat`/`@trans.semi` of its staff definition.

use super::interval::{transpose_tonic, Interval, TransPitch};
use super::harm::transpose_harm_text;
use super::request::TranspositionRequest;
use super::staff_map::{StaffMap, ALL_STAVES};
use crate::functor::{Functor, FunctorCode};
use crate::models::pitch::{key_alteration, Accidental};
use crate::models::{Document, NodeClass, NodeId, NodeKind, PitchName};

/// Key of a staff before and after transposition, in fifths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyContext {
    pub original: i32,
    pub transposed: i32,
}

/// Definition element being visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefScope {
    Score,
    Staff(i32),
}

/// Which interval applies where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransposeMode {
    Literal(TranspositionRequest),
    SoundingPitch,
}

#[derive(Debug)]
pub struct TransposeFunctor {
    mode: TransposeMode,
    selected_mdiv: Option<String>,

    mdiv_ids: Vec<String>,
    keys: StaffMap<KeyContext>,
    /// Interval of the literal request, once resolved against the score key
    base_interval: Option<Interval>,
    /// Per-staff intervals in sounding-pitch mode
    staff_intervals: StaffMap<Interval>,
    def_scopes: Vec<DefScope>,
    current_staff: Option<i32>,

    /// Score-level key signatures waiting for the staff intervals
    deferred_key_sigs: Vec<NodeId>,
    score_def_intervals: Vec<Interval>,

    transposed: usize,
}

impl TransposeFunctor {
    pub fn new(request: TranspositionRequest) -> Self {
        Self::with_mode(TransposeMode::Literal(request))
    }

    /// Rewrite written pitches of transposing staves as sounding pitches
    pub fn to_sounding_pitch() -> Self {
        Self::with_mode(TransposeMode::SoundingPitch)
    }

    fn with_mode(mode: TransposeMode) -> Self {
        Self {
            mode,
            selected_mdiv: None,
            mdiv_ids: Vec::new(),
            keys: StaffMap::new(),
            base_interval: None,
            staff_intervals: StaffMap::new(),
            def_scopes: Vec::new(),
            current_staff: None,
            deferred_key_sigs: Vec::new(),
            score_def_intervals: Vec::new(),
            transposed: 0,
        }
    }

    /// Limit the pass to one movement and the movements nested in it
    ///
    /// Ignored when transposing to sounding pitch.
    pub fn with_selected_mdiv(mut self, xml_id: impl Into<String>) -> Self {
        self.selected_mdiv = Some(xml_id.into());
        self
    }

    /// Number of notes, key signatures, chord symbols and rests changed
    pub fn transposed_count(&self) -> usize {
        self.transposed
    }

    fn is_sounding(&self) -> bool {
        self.mode == TransposeMode::SoundingPitch
    }

    fn in_scope(&self) -> bool {
        if self.is_sounding() {
            return true;
        }
        match &self.selected_mdiv {
            Some(selected) => self.mdiv_ids.iter().any(|id| id == selected),
            None => true,
        }
    }

    /// Resolve the literal request against a key; `false` if it cannot be
    fn resolve(
        &mut self,
        key_fifths: i32,
        tonic: Option<(PitchName, i32)>,
        previous_fifths: Option<i32>,
    ) -> bool {
        let TransposeMode::Literal(request) = self.mode else {
            return true;
        };
        match request.resolve(key_fifths, tonic, previous_fifths) {
            Some(interval) => {
                log::debug!("Transposition {} resolved to {}", request, interval);
                self.base_interval = Some(interval);
                true
            }
            None => false,
        }
    }

    /// Interval for content on `staff_n`
    fn interval_for(&mut self, staff_n: i32) -> Interval {
        match self.mode {
            TransposeMode::SoundingPitch => self
                .staff_intervals
                .get(staff_n)
                .copied()
                .unwrap_or(Interval::UNISON),
            TransposeMode::Literal(_) => {
                if self.base_interval.is_none() {
                    self.resolve(0, None, None);
                }
                self.base_interval.unwrap_or(Interval::UNISON)
            }
        }
    }

    /// Staff a key signature belongs to, from where it sits
    fn key_sig_staff(&self) -> i32 {
        match self.def_scopes.last() {
            Some(DefScope::Staff(n)) => *n,
            Some(DefScope::Score) => ALL_STAVES,
            None => self.current_staff.unwrap_or(ALL_STAVES),
        }
    }

    fn record_key(&mut self, staff_n: i32, key: KeyContext) {
        if staff_n == ALL_STAVES {
            self.keys.set_all(key);
        } else {
            self.keys.insert(staff_n, key);
        }
    }

    /// Transpose a key signature node; returns its key before and after
    fn transpose_key_sig(doc: &mut Document, id: NodeId, interval: Interval) -> Option<KeyContext> {
        let NodeKind::KeySig(key_sig) = doc.kind_mut(id) else {
            return None;
        };
        let original = key_sig.sig;
        let transposed = interval.transpose_key_fifths(original, key_sig.previous_sig);
        if let Some(pname) = key_sig.pname {
            let alter = key_sig
                .accid
                .map(Accidental::alteration)
                .unwrap_or_else(|| key_alteration(original, pname));
            let (new_pname, new_alter) = transpose_tonic(pname, alter, original, transposed);
            key_sig.pname = Some(new_pname);
            key_sig.accid = if new_alter != 0 || key_sig.accid.is_some() {
                Accidental::from_alteration(new_alter)
            } else {
                None
            };
        }
        key_sig.sig = transposed;
        key_sig.previous_sig = Some(original);
        Some(KeyContext {
            original,
            transposed,
        })
    }

    /// Transpose the score-level key signatures held back until the staff intervals were known
    fn flush_deferred_key_sigs(&mut self, doc: &mut Document) {
        let deferred = std::mem::take(&mut self.deferred_key_sigs);
        let mut intervals = std::mem::take(&mut self.score_def_intervals);
        if deferred.is_empty() {
            return;
        }
        if intervals.is_empty() {
            intervals = self.staff_intervals.staff_values().copied().collect();
        }
        let Some(&first) = intervals.first() else {
            return;
        };
        if intervals.iter().any(|&i| i != first) {
            log::warn!("Staves transpose by different intervals; score key signature left unchanged");
            return;
        }
        if first.is_unison() {
            return;
        }
        for id in deferred {
            if let Some(key) = Self::transpose_key_sig(doc, id, first) {
                // staff-specific keys set since then stay
                self.keys.insert(ALL_STAVES, key);
                self.transposed += 1;
            }
        }
    }
}

impl Functor for TransposeFunctor {
    fn implements_end_interface(&self) -> bool {
        true
    }

    fn visit_mdiv(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.mdiv_ids.push(doc.xml_id(id).to_string());
        FunctorCode::Continue
    }

    fn visit_mdiv_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        // in page-based form the movement ends at its milestone end
        let on_page = doc
            .parent(id)
            .is_some_and(|parent| doc.class(parent) == NodeClass::Page);
        if !on_page {
            self.mdiv_ids.pop();
        }
        FunctorCode::Continue
    }

    fn visit_page_milestone_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let NodeKind::PageMilestoneEnd(end) = doc.kind(id) else {
            return FunctorCode::Continue;
        };
        let closes_mdiv = doc
            .find_by_xml_id(&end.start)
            .is_some_and(|start| doc.class(start) == NodeClass::Mdiv);
        if closes_mdiv {
            self.mdiv_ids.pop();
        }
        FunctorCode::Continue
    }

    fn visit_score(&mut self, _doc: &mut Document, _id: NodeId) -> FunctorCode {
        self.keys.clear();
        self.staff_intervals.clear();
        self.base_interval = None;
        FunctorCode::Continue
    }

    fn visit_score_def(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.def_scopes.push(DefScope::Score);
        self.score_def_intervals.clear();

        if self.base_interval.is_some() || self.is_sounding() || !self.in_scope() {
            return FunctorCode::Continue;
        }
        let key = doc
            .children(id)
            .iter()
            .find_map(|&c| match doc.kind(c) {
                NodeKind::KeySig(key_sig) => Some(key_sig.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let tonic = key.pname.map(|pname| {
            let alter = key
                .accid
                .map(Accidental::alteration)
                .unwrap_or_else(|| key_alteration(key.sig, pname));
            (pname, alter)
        });
        if !self.resolve(key.sig, tonic, key.previous_sig) {
            log::warn!(
                "Cannot name the tonic of a key with {} fifths; transposition stopped",
                key.sig
            );
            return FunctorCode::Stop;
        }
        FunctorCode::Continue
    }

    fn visit_score_def_end(&mut self, doc: &mut Document, _id: NodeId) -> FunctorCode {
        if self.is_sounding() {
            self.flush_deferred_key_sigs(doc);
        }
        self.def_scopes.pop();
        FunctorCode::Continue
    }

    fn visit_staff_def(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let (staff_n, trans_diat, trans_semi) = match doc.kind(id) {
            NodeKind::StaffDef(staff_def) => (staff_def.n, staff_def.trans_diat, staff_def.trans_semi),
            _ => return FunctorCode::Continue,
        };
        self.def_scopes.push(DefScope::Staff(staff_n));
        if !self.is_sounding() {
            return FunctorCode::Continue;
        }

        // a restated staffDef without an offset keeps the staff's interval
        let declared = match (trans_diat, trans_semi) {
            (Some(diatonic), Some(chromatic)) => Some(Interval::new(diatonic, chromatic)),
            (None, Some(chromatic)) => {
                let key = self.keys.get(staff_n).map_or(0, |k| k.original);
                Some(Interval::for_semitones(chromatic, key, None))
            }
            _ => None,
        };
        if let Some(interval) = declared {
            self.staff_intervals.insert(staff_n, interval);
        }
        let interval = self
            .staff_intervals
            .get(staff_n)
            .copied()
            .unwrap_or(Interval::UNISON);
        self.score_def_intervals.push(interval);

        // the staff now sounds as written
        if let NodeKind::StaffDef(staff_def) = doc.kind_mut(id) {
            staff_def.trans_diat = None;
            staff_def.trans_semi = None;
        }
        FunctorCode::Continue
    }

    fn visit_staff_def_end(&mut self, _doc: &mut Document, _id: NodeId) -> FunctorCode {
        self.def_scopes.pop();
        FunctorCode::Continue
    }

    fn visit_staff(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.current_staff = doc.kind(id).staff_n();
        FunctorCode::Continue
    }

    fn visit_system_end(&mut self, _doc: &mut Document, _id: NodeId) -> FunctorCode {
        self.current_staff = None;
        FunctorCode::Continue
    }

    fn visit_key_sig(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let staff_n = self.key_sig_staff();
        let NodeKind::KeySig(key_sig) = doc.kind(id) else {
            return FunctorCode::Continue;
        };
        let sig = key_sig.sig;
        let unchanged = KeyContext {
            original: sig,
            transposed: sig,
        };

        if !self.in_scope() {
            self.record_key(staff_n, unchanged);
            return FunctorCode::Continue;
        }
        if self.is_sounding() && staff_n == ALL_STAVES && !self.def_scopes.is_empty() {
            self.deferred_key_sigs.push(id);
            self.record_key(staff_n, unchanged);
            return FunctorCode::Continue;
        }

        let interval = self.interval_for(staff_n);
        if interval.is_unison() {
            self.record_key(staff_n, unchanged);
            return FunctorCode::Continue;
        }
        let key = Self::transpose_key_sig(doc, id, interval).unwrap_or(unchanged);
        self.record_key(staff_n, key);
        self.transposed += 1;
        FunctorCode::Continue
    }

    fn visit_note(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        if !self.in_scope() {
            return FunctorCode::Continue;
        }
        let staff_n = self.current_staff.unwrap_or(ALL_STAVES);
        let interval = self.interval_for(staff_n);
        if interval.is_unison() {
            return FunctorCode::Continue;
        }
        let key = self.keys.get(staff_n).copied().unwrap_or_default();

        let NodeKind::Note(note) = doc.kind_mut(id) else {
            return FunctorCode::Continue;
        };
        let alter = note.alteration_in_key(key.original);
        let pitch = TransPitch::new(note.pname, alter, note.oct).transpose(interval);
        let accid = Accidental::from_alteration(pitch.alter);

        if note.accid.is_some() {
            note.accid = accid;
            note.accid_ges = None;
        } else if key_alteration(key.transposed, pitch.pname) == pitch.alter {
            note.accid = None;
            note.accid_ges = note.accid_ges.and(accid);
        } else {
            note.accid = accid;
            note.accid_ges = None;
        }
        note.pname = pitch.pname;
        note.oct = pitch.oct;
        self.transposed += 1;
        FunctorCode::Continue
    }

    fn visit_rest(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        if self.is_sounding() || !self.in_scope() {
            return FunctorCode::Continue;
        }
        let staff_n = self.current_staff.unwrap_or(ALL_STAVES);
        let interval = self.interval_for(staff_n);
        if interval.is_unison() {
            return FunctorCode::Continue;
        }
        let NodeKind::Rest(rest) = doc.kind_mut(id) else {
            return FunctorCode::Continue;
        };
        if let (Some(ploc), Some(oloc)) = (rest.ploc, rest.oloc) {
            let position = TransPitch::new(ploc, 0, oloc).transpose(interval);
            rest.ploc = Some(position.pname);
            rest.oloc = Some(position.oct);
            self.transposed += 1;
        }
        FunctorCode::Continue
    }

    fn visit_harm(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        if !self.in_scope() {
            return FunctorCode::Continue;
        }
        let NodeKind::Harm(harm) = doc.kind(id) else {
            return FunctorCode::Continue;
        };
        let staff_n = harm.staff.unwrap_or(ALL_STAVES);
        let text = harm.text.clone();
        let interval = self.interval_for(staff_n);
        if interval.is_unison() {
            return FunctorCode::Continue;
        }
        match transpose_harm_text(&text, interval) {
            Some(transposed) => {
                if let NodeKind::Harm(harm) = doc.kind_mut(id) {
                    harm.text = transposed;
                }
                self.transposed += 1;
            }
            None => log::debug!("Harm '{}' is not a chord symbol, left as is", text),
        }
        FunctorCode::Continue
    }
}
