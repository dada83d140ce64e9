//! Cast-off of unmeasured (mensural) content into measures
//!
//! Each unmeasured measure of a system holds one continuous stretch of
//! music. It is cut wherever every registered staff has a barline at the same
//! onset. Content is moved one `(staff, layer)` pair at a time, in the order of
//! the layer tree, into a temporary sub-system whose measures are then handed
//! to the target system. Barlines only mark the cuts; they are not kept.

use std::collections::BTreeSet;

use num_rational::Ratio;

use super::alignment::{element_duration, BarLineAlignment};
use crate::functor::{Filters, Functor, FunctorCode, InitProcessingListsFunctor};
use crate::models::{BarRendition, Document, IntTree, Measure, NodeClass, NodeId, NodeKind, Time};

/// Options of the cast-off pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CastOffOptions {
    /// Mark the new measures as measured and close the last one with an end barline
    pub to_measured: bool,
}

/// Cuts unmeasured measures at barlines shared by all registered staves
#[derive(Debug)]
pub struct ConvertToCastOffMensuralFunctor {
    target_system: NodeId,
    layer_tree: IntTree,
    options: CastOffOptions,
    staff_ns: BTreeSet<i32>,
    filters: Option<Filters>,

    // state of the measure being cut
    target_sub_system: Option<NodeId>,
    target_measure: Option<NodeId>,
    target_staff: Option<NodeId>,
    target_layer: Option<NodeId>,
    boundaries: Vec<Time>,
    content_end: Time,

    // state of the layer being moved
    next_boundary: usize,
    segment_idx: usize,
    onset: Time,

    segment_total: usize,
}

impl ConvertToCastOffMensuralFunctor {
    pub fn new(target_system: NodeId, layer_tree: IntTree, options: CastOffOptions) -> Self {
        Self {
            target_system,
            layer_tree,
            options,
            staff_ns: BTreeSet::new(),
            filters: None,
            target_sub_system: None,
            target_measure: None,
            target_staff: None,
            target_layer: None,
            boundaries: Vec::new(),
            content_end: Ratio::from_integer(0),
            next_boundary: 0,
            segment_idx: 0,
            onset: Ratio::from_integer(0),
            segment_total: 0,
        }
    }

    /// Continue numbering after `segment_total` segments created elsewhere
    pub fn with_segment_total(mut self, segment_total: usize) -> Self {
        self.segment_total = segment_total;
        self
    }

    pub fn add_staff_n(&mut self, staff_n: i32) {
        self.staff_ns.insert(staff_n);
    }

    pub fn clear_staff_ns(&mut self) {
        self.staff_ns.clear();
    }

    /// Segments created so far, including the starting offset
    pub fn segment_total(&self) -> usize {
        self.segment_total
    }

    fn new_segment(&self, doc: &mut Document, sub_system: NodeId, segment_idx: usize) -> NodeId {
        let n = self.segment_total + segment_idx + 1;
        let measure = Measure {
            n: Some(n.to_string()),
            measured: self.options.to_measured,
            right: None,
        };
        doc.append(sub_system, NodeKind::Measure(measure))
    }

    /// Cut one unmeasured measure into the target system
    fn cast_off_measure(&mut self, doc: &mut Document, measure: NodeId) -> FunctorCode {
        let alignment = BarLineAlignment::from_measure(doc, measure);
        self.boundaries = alignment.boundaries(&self.staff_ns);
        self.content_end = alignment.content_end();
        log::debug!(
            "Casting off measure {} at {} boundaries",
            doc.xml_id(measure),
            self.boundaries.len()
        );

        let sub_system = doc.create(NodeKind::System);
        let first = self.new_segment(doc, sub_system, 0);
        self.target_sub_system = Some(sub_system);

        let controls: Vec<NodeId> = doc
            .children(measure)
            .iter()
            .copied()
            .filter(|&c| doc.class(c) == NodeClass::Harm)
            .collect();
        for control in controls {
            doc.move_to(control, first);
        }

        for (staff_n, layer_n) in self.layer_tree.pairs() {
            self.filters = Some(Filters::new(Some(staff_n), Some(layer_n)));
            self.target_measure = Some(first);
            self.target_staff = None;
            self.target_layer = None;
            self.next_boundary = 0;
            self.segment_idx = 0;
            self.onset = Ratio::from_integer(0);
            if doc.process(measure, self) == FunctorCode::Stop {
                return FunctorCode::Stop;
            }
        }
        self.filters = None;
        self.target_measure = None;
        self.target_staff = None;
        self.target_layer = None;

        let segments = doc.children(sub_system).to_vec();
        if self.options.to_measured {
            if let Some(&last) = segments.last() {
                if let NodeKind::Measure(m) = doc.kind_mut(last) {
                    m.right.get_or_insert(BarRendition::End);
                }
            }
        }
        doc.move_children(sub_system, self.target_system);
        self.segment_total += segments.len();
        self.target_sub_system = None;
        doc.detach(measure);

        FunctorCode::SkipChildren
    }

    /// Child of `parent` with the same kind as `like`, created by cloning `like` if missing
    fn find_or_clone(doc: &mut Document, parent: NodeId, like: NodeId) -> NodeId {
        let wanted = doc.kind(like).clone();
        if let Some(existing) = doc.find_child(parent, |k| *k == wanted) {
            return existing;
        }
        let clone = doc.clone_shallow(like);
        doc.attach(parent, clone);
        clone
    }

    /// Move the current layer on to the next segment
    fn cross_boundary(&mut self, doc: &mut Document) {
        self.next_boundary += 1;
        let (Some(sub_system), Some(staff), Some(layer)) =
            (self.target_sub_system, self.target_staff, self.target_layer)
        else {
            return;
        };
        self.segment_idx += 1;
        let measure = match doc.children(sub_system).get(self.segment_idx) {
            Some(&existing) => existing,
            None => self.new_segment(doc, sub_system, self.segment_idx),
        };
        let staff = Self::find_or_clone(doc, measure, staff);
        let layer = Self::find_or_clone(doc, staff, layer);
        self.target_measure = Some(measure);
        self.target_staff = Some(staff);
        self.target_layer = Some(layer);
    }

    /// Cross every pending boundary before `onset` (or at it, when `inclusive`)
    fn cross_boundaries_to(&mut self, doc: &mut Document, onset: Time, inclusive: bool) {
        while let Some(&boundary) = self.boundaries.get(self.next_boundary) {
            if boundary < onset || (inclusive && boundary == onset) {
                self.cross_boundary(doc);
            } else {
                break;
            }
        }
    }

    /// Give the current segment the form of `bar_line` as its right barline
    fn close_target_measure(&self, doc: &mut Document, bar_line: NodeId) {
        let form = match doc.kind(bar_line) {
            NodeKind::BarLine(bar_line) => bar_line.form,
            _ => BarRendition::Single,
        };
        if let Some(measure) = self.target_measure {
            if let NodeKind::Measure(m) = doc.kind_mut(measure) {
                m.right.get_or_insert(form);
            }
        }
    }

    fn in_content_layer(&self, doc: &Document, id: NodeId) -> bool {
        self.target_layer.is_some()
            && doc
                .parent(id)
                .is_some_and(|parent| doc.class(parent) == NodeClass::Layer)
    }

    fn move_to_target(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        doc.move_to(id, self.target_system);
        FunctorCode::SkipChildren
    }
}

impl Functor for ConvertToCastOffMensuralFunctor {
    fn filters(&self) -> Option<&Filters> {
        self.filters.as_ref()
    }

    fn visit_object(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        if !self.in_content_layer(doc, id) {
            return FunctorCode::Continue;
        }
        let duration = element_duration(doc, id);
        let inclusive = duration > Ratio::from_integer(0);
        self.cross_boundaries_to(doc, self.onset, inclusive);
        if let Some(layer) = self.target_layer {
            doc.move_to(id, layer);
        }
        self.onset += duration;
        FunctorCode::SkipChildren
    }

    fn visit_bar_line(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        if !self.in_content_layer(doc, id) {
            return FunctorCode::Continue;
        }
        self.cross_boundaries_to(doc, self.onset, false);
        if self.boundaries.get(self.next_boundary) == Some(&self.onset) {
            self.close_target_measure(doc, id);
            self.cross_boundary(doc);
        } else if self.onset == self.content_end && self.onset > Ratio::from_integer(0) {
            // closing barline of the stretch
            self.close_target_measure(doc, id);
        }
        doc.detach(id);
        FunctorCode::SkipChildren
    }

    fn visit_measure(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        // re-entered for one (staff, layer) pair
        if self.target_measure.is_some() {
            return FunctorCode::Continue;
        }
        let measured = matches!(doc.kind(id), NodeKind::Measure(m) if m.measured);
        if measured {
            return self.move_to_target(doc, id);
        }
        self.cast_off_measure(doc, id)
    }

    fn visit_staff(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let Some(measure) = self.target_measure else {
            return FunctorCode::Continue;
        };
        self.target_staff = Some(Self::find_or_clone(doc, measure, id));
        FunctorCode::Continue
    }

    fn visit_layer(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let Some(staff) = self.target_staff else {
            return FunctorCode::Continue;
        };
        self.target_layer = Some(Self::find_or_clone(doc, staff, id));
        FunctorCode::Continue
    }

    fn visit_score_def(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.move_to_target(doc, id)
    }

    fn visit_system_element(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.move_to_target(doc, id)
    }

    fn visit_editorial_element(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let at_system_level = doc
            .parent(id)
            .is_some_and(|parent| doc.class(parent) == NodeClass::System);
        if at_system_level {
            return self.move_to_target(doc, id);
        }
        self.visit_object(doc, id)
    }
}

/// Summary of a cast-off run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CastOffSummary {
    pub systems: usize,
    pub segments: usize,
}

/// Cast off every system of a page-based document
///
/// Returns `None` when the document is not page-based.
pub fn convert_document(doc: &mut Document, options: CastOffOptions) -> Option<CastOffSummary> {
    if !doc.is_page_based() {
        return None;
    }

    let root = doc.root();
    let mut lists = InitProcessingListsFunctor::new();
    doc.process(root, &mut lists);
    let layer_tree = lists.into_layer_tree();

    let mut summary = CastOffSummary::default();
    for page in doc.pages() {
        let systems: Vec<NodeId> = doc
            .children(page)
            .iter()
            .copied()
            .filter(|&c| doc.class(c) == NodeClass::System)
            .collect();
        for system in systems {
            let target = doc.create(NodeKind::System);
            let mut functor =
                ConvertToCastOffMensuralFunctor::new(target, layer_tree.clone(), options)
                    .with_segment_total(summary.segments);
            for staff_n in layer_tree.keys() {
                functor.add_staff_n(staff_n);
            }
            doc.process(system, &mut functor);
            doc.replace(system, target);

            summary.systems += 1;
            summary.segments = functor.segment_total();
        }
    }
    Some(summary)
}
