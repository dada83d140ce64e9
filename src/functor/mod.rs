//! Tree walk with per-kind callbacks
//!
//! A pass implements [`Functor`] and overrides only the `visit_*` methods it
//! needs. Unhandled kinds fall back through their family
//! (`visit_system_element`, `visit_layer_element`, ...) to
//! [`Functor::visit_object`], which continues by default.
//!
//! [`Document::process`] walks depth-first in document order. A node's child
//! list is snapshotted after its own visit; entries that an earlier visit moved
//! somewhere else are skipped, so passes may relocate the node being visited
//! or any later sibling.

mod filters;
mod processing_lists;

pub use filters::Filters;
pub use processing_lists::InitProcessingListsFunctor;

use crate::models::{Document, NodeClass, NodeId};

/// Result of a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctorCode {
    Continue,
    /// Do not descend; the end visit is skipped as well
    SkipChildren,
    /// Abort the whole walk
    Stop,
}

macro_rules! visit_family {
    ($($name:ident => $parent:ident),* $(,)?) => {
        $(
            fn $name(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
                self.$parent(doc, id)
            }
        )*
    };
}

/// Per-kind callbacks of a pass
#[allow(unused_variables)]
pub trait Functor {
    /// Whether `visit_*_end` callbacks are invoked after the children
    fn implements_end_interface(&self) -> bool {
        false
    }

    fn filters(&self) -> Option<&Filters> {
        None
    }

    fn visit_object(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        FunctorCode::Continue
    }

    fn visit_object_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        FunctorCode::Continue
    }

    visit_family! {
        visit_doc => visit_object,
        visit_pages => visit_object,
        visit_page => visit_object,
        visit_system => visit_object,
        visit_page_element => visit_object,
        visit_mdiv => visit_page_element,
        visit_score => visit_page_element,
        visit_page_milestone_end => visit_page_element,
        visit_score_def => visit_object,
        visit_staff_grp => visit_object,
        visit_staff_def => visit_object,
        visit_system_element => visit_object,
        visit_section => visit_system_element,
        visit_ending => visit_system_element,
        visit_pb => visit_system_element,
        visit_sb => visit_system_element,
        visit_system_milestone_end => visit_system_element,
        visit_editorial_element => visit_object,
        visit_measure => visit_object,
        visit_staff => visit_object,
        visit_layer => visit_object,
        visit_layer_element => visit_object,
        visit_bar_line => visit_layer_element,
        visit_note => visit_layer_element,
        visit_rest => visit_layer_element,
        visit_chord => visit_layer_element,
        visit_ligature => visit_layer_element,
        visit_clef => visit_layer_element,
        visit_key_sig => visit_layer_element,
        visit_control_element => visit_object,
        visit_harm => visit_control_element,
    }

    visit_family! {
        visit_doc_end => visit_object_end,
        visit_pages_end => visit_object_end,
        visit_page_end => visit_object_end,
        visit_system_end => visit_object_end,
        visit_page_element_end => visit_object_end,
        visit_mdiv_end => visit_page_element_end,
        visit_score_end => visit_page_element_end,
        visit_page_milestone_end_end => visit_page_element_end,
        visit_score_def_end => visit_object_end,
        visit_staff_grp_end => visit_object_end,
        visit_staff_def_end => visit_object_end,
        visit_system_element_end => visit_object_end,
        visit_section_end => visit_system_element_end,
        visit_ending_end => visit_system_element_end,
        visit_pb_end => visit_system_element_end,
        visit_sb_end => visit_system_element_end,
        visit_system_milestone_end_end => visit_system_element_end,
        visit_editorial_element_end => visit_object_end,
        visit_measure_end => visit_object_end,
        visit_staff_end => visit_object_end,
        visit_layer_end => visit_object_end,
        visit_layer_element_end => visit_object_end,
        visit_bar_line_end => visit_layer_element_end,
        visit_note_end => visit_layer_element_end,
        visit_rest_end => visit_layer_element_end,
        visit_chord_end => visit_layer_element_end,
        visit_ligature_end => visit_layer_element_end,
        visit_clef_end => visit_layer_element_end,
        visit_key_sig_end => visit_layer_element_end,
        visit_control_element_end => visit_object_end,
        visit_harm_end => visit_control_element_end,
    }
}

fn dispatch<F: Functor + ?Sized>(functor: &mut F, doc: &mut Document, id: NodeId) -> FunctorCode {
    match doc.class(id) {
        NodeClass::Doc => functor.visit_doc(doc, id),
        NodeClass::Pages => functor.visit_pages(doc, id),
        NodeClass::Page => functor.visit_page(doc, id),
        NodeClass::System => functor.visit_system(doc, id),
        NodeClass::Mdiv => functor.visit_mdiv(doc, id),
        NodeClass::Score => functor.visit_score(doc, id),
        NodeClass::PageMilestoneEnd => functor.visit_page_milestone_end(doc, id),
        NodeClass::ScoreDef => functor.visit_score_def(doc, id),
        NodeClass::StaffGrp => functor.visit_staff_grp(doc, id),
        NodeClass::StaffDef => functor.visit_staff_def(doc, id),
        NodeClass::Section => functor.visit_section(doc, id),
        NodeClass::Ending => functor.visit_ending(doc, id),
        NodeClass::Pb => functor.visit_pb(doc, id),
        NodeClass::Sb => functor.visit_sb(doc, id),
        NodeClass::SystemMilestoneEnd => functor.visit_system_milestone_end(doc, id),
        NodeClass::Editorial => functor.visit_editorial_element(doc, id),
        NodeClass::Measure => functor.visit_measure(doc, id),
        NodeClass::Staff => functor.visit_staff(doc, id),
        NodeClass::Layer => functor.visit_layer(doc, id),
        NodeClass::BarLine => functor.visit_bar_line(doc, id),
        NodeClass::Note => functor.visit_note(doc, id),
        NodeClass::Rest => functor.visit_rest(doc, id),
        NodeClass::Chord => functor.visit_chord(doc, id),
        NodeClass::Ligature => functor.visit_ligature(doc, id),
        NodeClass::Clef => functor.visit_clef(doc, id),
        NodeClass::KeySig => functor.visit_key_sig(doc, id),
        NodeClass::Harm => functor.visit_harm(doc, id),
    }
}

fn dispatch_end<F: Functor + ?Sized>(
    functor: &mut F,
    doc: &mut Document,
    id: NodeId,
) -> FunctorCode {
    match doc.class(id) {
        NodeClass::Doc => functor.visit_doc_end(doc, id),
        NodeClass::Pages => functor.visit_pages_end(doc, id),
        NodeClass::Page => functor.visit_page_end(doc, id),
        NodeClass::System => functor.visit_system_end(doc, id),
        NodeClass::Mdiv => functor.visit_mdiv_end(doc, id),
        NodeClass::Score => functor.visit_score_end(doc, id),
        NodeClass::PageMilestoneEnd => functor.visit_page_milestone_end_end(doc, id),
        NodeClass::ScoreDef => functor.visit_score_def_end(doc, id),
        NodeClass::StaffGrp => functor.visit_staff_grp_end(doc, id),
        NodeClass::StaffDef => functor.visit_staff_def_end(doc, id),
        NodeClass::Section => functor.visit_section_end(doc, id),
        NodeClass::Ending => functor.visit_ending_end(doc, id),
        NodeClass::Pb => functor.visit_pb_end(doc, id),
        NodeClass::Sb => functor.visit_sb_end(doc, id),
        NodeClass::SystemMilestoneEnd => functor.visit_system_milestone_end_end(doc, id),
        NodeClass::Editorial => functor.visit_editorial_element_end(doc, id),
        NodeClass::Measure => functor.visit_measure_end(doc, id),
        NodeClass::Staff => functor.visit_staff_end(doc, id),
        NodeClass::Layer => functor.visit_layer_end(doc, id),
        NodeClass::BarLine => functor.visit_bar_line_end(doc, id),
        NodeClass::Note => functor.visit_note_end(doc, id),
        NodeClass::Rest => functor.visit_rest_end(doc, id),
        NodeClass::Chord => functor.visit_chord_end(doc, id),
        NodeClass::Ligature => functor.visit_ligature_end(doc, id),
        NodeClass::Clef => functor.visit_clef_end(doc, id),
        NodeClass::KeySig => functor.visit_key_sig_end(doc, id),
        NodeClass::Harm => functor.visit_harm_end(doc, id),
    }
}

impl Document {
    /// Walk the subtree of `root` with `functor`
    ///
    /// Returns [`FunctorCode::Stop`] if a visit stopped the walk, otherwise
    /// [`FunctorCode::Continue`].
    pub fn process<F: Functor + ?Sized>(&mut self, root: NodeId, functor: &mut F) -> FunctorCode {
        if let Some(filters) = functor.filters() {
            if !filters.accepts(self.kind(root)) {
                return FunctorCode::Continue;
            }
        }

        match dispatch(functor, self, root) {
            FunctorCode::Stop => return FunctorCode::Stop,
            FunctorCode::SkipChildren => return FunctorCode::Continue,
            FunctorCode::Continue => {}
        }

        let children = self.children(root).to_vec();
        for child in children {
            // moved away by an earlier visit
            if self.parent(child) != Some(root) {
                continue;
            }
            if self.process(child, functor) == FunctorCode::Stop {
                return FunctorCode::Stop;
            }
        }

        if functor.implements_end_interface() && dispatch_end(functor, self, root) == FunctorCode::Stop {
            return FunctorCode::Stop;
        }
        FunctorCode::Continue
    }
}
