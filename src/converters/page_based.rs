//! Page-based conversion
//!
//! Rewrites the logical nesting `mdiv > score > section > measure` into
//! `pages > page > system > measure`. Containers do not survive as parents:
//! each one stays in place as an empty begin milestone and a matching end
//! node is appended after the content it used to hold. Mdiv and Score become
//! page milestones, everything below them system milestones.
//!
//! [`page_based_outline`] reads the milestone pairs back; it yields the same
//! outline [`logical_outline`] builds from the nested form.

use serde::Serialize;
use thiserror::Error;

use crate::functor::{Functor, FunctorCode};
use crate::models::{Document, MilestoneEnd, NodeClass, NodeId, NodeKind};

/// Moves logical containers into a page and its systems
#[derive(Debug)]
pub struct ConvertToPageBasedFunctor {
    page: NodeId,
    current_system: Option<NodeId>,
    systems_created: usize,
}

impl ConvertToPageBasedFunctor {
    pub fn new(page: NodeId) -> Self {
        Self {
            page,
            current_system: None,
            systems_created: 0,
        }
    }

    pub fn systems_created(&self) -> usize {
        self.systems_created
    }

    /// Current system, created and appended to the page if there is none
    fn system(&mut self, doc: &mut Document) -> NodeId {
        if let Some(system) = self.current_system {
            return system;
        }
        let system = doc.append(self.page, NodeKind::System);
        self.systems_created += 1;
        self.current_system = Some(system);
        system
    }

    fn open_system_milestone(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let system = self.system(doc);
        doc.move_to(id, system);
        FunctorCode::Continue
    }

    fn close_system_milestone(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let system = self.system(doc);
        let start = doc.xml_id(id).to_string();
        doc.append(system, NodeKind::SystemMilestoneEnd(MilestoneEnd { start }));
        FunctorCode::Continue
    }

    fn close_page_milestone(&mut self, doc: &mut Document, id: NodeId) {
        let start = doc.xml_id(id).to_string();
        doc.append(self.page, NodeKind::PageMilestoneEnd(MilestoneEnd { start }));
    }
}

impl Functor for ConvertToPageBasedFunctor {
    fn implements_end_interface(&self) -> bool {
        true
    }

    fn visit_mdiv(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        doc.move_to(id, self.page);
        FunctorCode::Continue
    }

    fn visit_mdiv_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.close_page_milestone(doc, id);
        FunctorCode::Continue
    }

    fn visit_score(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        doc.move_to(id, self.page);
        let system = doc.append(self.page, NodeKind::System);
        self.systems_created += 1;
        self.current_system = Some(system);
        FunctorCode::Continue
    }

    fn visit_score_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.close_page_milestone(doc, id);
        self.current_system = None;
        FunctorCode::Continue
    }

    fn visit_score_def(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let system = self.system(doc);
        doc.move_to(id, system);
        FunctorCode::SkipChildren
    }

    fn visit_section(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.open_system_milestone(doc, id)
    }

    fn visit_section_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.close_system_milestone(doc, id)
    }

    fn visit_ending(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.open_system_milestone(doc, id)
    }

    fn visit_ending_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.close_system_milestone(doc, id)
    }

    fn visit_editorial_element(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.open_system_milestone(doc, id)
    }

    fn visit_editorial_element_end(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        self.close_system_milestone(doc, id)
    }

    // pb, sb
    fn visit_system_element(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let system = self.system(doc);
        doc.move_to(id, system);
        FunctorCode::SkipChildren
    }

    fn visit_measure(&mut self, doc: &mut Document, id: NodeId) -> FunctorCode {
        let system = self.system(doc);
        doc.move_to(id, system);
        FunctorCode::SkipChildren
    }
}

/// Convert a logical document in place
///
/// Returns the number of systems created, or `None` when the document is
/// already page-based and was left untouched.
pub fn convert_document(doc: &mut Document) -> Option<usize> {
    if doc.is_page_based() {
        return None;
    }
    let pages = doc.create(NodeKind::Pages);
    let page = doc.append(pages, NodeKind::Page);

    let mut functor = ConvertToPageBasedFunctor::new(page);
    let root = doc.root();
    doc.process(root, &mut functor);
    doc.attach(root, pages);

    Some(functor.systems_created())
}

/// Container outline of a document, independent of its form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineNode {
    pub xml_id: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn from_node(doc: &Document, id: NodeId) -> Self {
        Self {
            xml_id: doc.xml_id(id).to_string(),
            tag: doc.kind(id).tag().to_string(),
            children: Vec::new(),
        }
    }
}

/// Milestone pairs that do not nest
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MilestoneError {
    #[error("Milestone end for '{found}' while '{expected}' is open")]
    Mismatched { expected: String, found: String },

    #[error("Milestone end for '{0}' without a matching start")]
    Unopened(String),

    #[error("Milestone '{0}' is never closed")]
    Unclosed(String),
}

fn is_container(class: NodeClass) -> bool {
    matches!(
        class,
        NodeClass::Mdiv
            | NodeClass::Score
            | NodeClass::Section
            | NodeClass::Ending
            | NodeClass::Editorial
    )
}

fn is_outline_leaf(class: NodeClass) -> bool {
    matches!(class, NodeClass::Measure | NodeClass::Pb | NodeClass::Sb)
}

/// Outline of a document in logical (nested) form
pub fn logical_outline(doc: &Document, root: NodeId) -> Vec<OutlineNode> {
    let mut out = Vec::new();
    for &child in doc.children(root) {
        let class = doc.class(child);
        if is_container(class) {
            let mut node = OutlineNode::from_node(doc, child);
            node.children = logical_outline(doc, child);
            out.push(node);
        } else if is_outline_leaf(class) {
            out.push(OutlineNode::from_node(doc, child));
        } else if class != NodeClass::ScoreDef {
            out.extend(logical_outline(doc, child));
        }
    }
    out
}

/// Outline of a page, rebuilt from its milestone pairs
pub fn page_based_outline(doc: &Document, page: NodeId) -> Result<Vec<OutlineNode>, MilestoneError> {
    let mut stack = vec![OutlineNode {
        xml_id: String::new(),
        tag: String::new(),
        children: Vec::new(),
    }];

    let mut nodes = Vec::new();
    for &child in doc.children(page) {
        if doc.class(child) == NodeClass::System {
            nodes.extend(doc.children(child).iter().copied());
        } else {
            nodes.push(child);
        }
    }

    for id in nodes {
        match doc.kind(id) {
            NodeKind::PageMilestoneEnd(end) | NodeKind::SystemMilestoneEnd(end) => {
                if stack.len() == 1 {
                    return Err(MilestoneError::Unopened(end.start.clone()));
                }
                let Some(node) = stack.pop() else {
                    return Err(MilestoneError::Unopened(end.start.clone()));
                };
                if node.xml_id != end.start {
                    return Err(MilestoneError::Mismatched {
                        expected: node.xml_id,
                        found: end.start.clone(),
                    });
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            kind if is_container(kind.class()) => stack.push(OutlineNode::from_node(doc, id)),
            kind if is_outline_leaf(kind.class()) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(OutlineNode::from_node(doc, id));
                }
            }
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.pop().map(|n| n.xml_id).unwrap_or_default();
        return Err(MilestoneError::Unclosed(open));
    }
    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ending, Mdiv, Measure};

    fn measure(doc: &mut Document, parent: NodeId, n: &str) -> NodeId {
        doc.append(parent, NodeKind::Measure(Measure::measured(Some(n.to_string()))))
    }

    fn tags(doc: &Document, id: NodeId) -> Vec<&'static str> {
        doc.children(id).iter().map(|&c| doc.kind(c).tag()).collect()
    }

    #[test]
    fn test_section_becomes_milestone_pair() {
        let mut doc = Document::new();
        let mdiv = doc.append(doc.root(), NodeKind::Mdiv(Mdiv::default()));
        let score = doc.append(mdiv, NodeKind::Score);
        doc.append(score, NodeKind::ScoreDef);
        let section = doc.append(score, NodeKind::Section);
        measure(&mut doc, section, "1");
        let ending = doc.append(section, NodeKind::Ending(Ending::default()));
        measure(&mut doc, ending, "2");

        assert_eq!(convert_document(&mut doc), Some(1));

        let page = doc.pages()[0];
        assert_eq!(
            tags(&doc, page),
            vec!["mdiv", "score", "system", "pageMilestoneEnd", "pageMilestoneEnd"]
        );
        let system = doc.children(page)[2];
        assert_eq!(
            tags(&doc, system),
            vec![
                "scoreDef",
                "section",
                "measure",
                "ending",
                "measure",
                "systemMilestoneEnd",
                "systemMilestoneEnd"
            ]
        );
        assert!(doc.children(section).is_empty());
        assert!(doc.children(ending).is_empty());

        // innermost container closes first
        let first_end = doc.children(system)[5];
        assert_eq!(
            doc.kind(first_end),
            &NodeKind::SystemMilestoneEnd(MilestoneEnd {
                start: doc.xml_id(ending).to_string()
            })
        );
    }

    #[test]
    fn test_empty_section_keeps_pair() {
        let mut doc = Document::new();
        let mdiv = doc.append(doc.root(), NodeKind::Mdiv(Mdiv::default()));
        let score = doc.append(mdiv, NodeKind::Score);
        doc.append(score, NodeKind::Section);

        convert_document(&mut doc);

        let page = doc.pages()[0];
        let system = doc.children(page)[2];
        assert_eq!(tags(&doc, system), vec!["section", "systemMilestoneEnd"]);
    }

    #[test]
    fn test_no_movements_yields_empty_page() {
        let mut doc = Document::new();
        assert_eq!(convert_document(&mut doc), Some(0));
        let pages = doc.pages();
        assert_eq!(pages.len(), 1);
        assert!(doc.children(pages[0]).is_empty());
    }

    #[test]
    fn test_scoreless_content_gets_a_system() {
        let mut doc = Document::new();
        let mdiv = doc.append(doc.root(), NodeKind::Mdiv(Mdiv::default()));
        let section = doc.append(mdiv, NodeKind::Section);
        measure(&mut doc, section, "1");

        assert_eq!(convert_document(&mut doc), Some(1));
        let page = doc.pages()[0];
        assert_eq!(tags(&doc, page), vec!["mdiv", "system", "pageMilestoneEnd"]);
    }

    #[test]
    fn test_conversion_is_idempotent() {
        let mut doc = Document::new();
        let mdiv = doc.append(doc.root(), NodeKind::Mdiv(Mdiv::default()));
        doc.append(mdiv, NodeKind::Score);

        assert_eq!(convert_document(&mut doc), Some(1));
        let before = doc.to_tree();
        assert_eq!(convert_document(&mut doc), None);
        assert_eq!(doc.to_tree(), before);
    }

    #[test]
    fn test_outline_round_trip() {
        let mut doc = Document::new();
        for _ in 0..2 {
            let mdiv = doc.append(doc.root(), NodeKind::Mdiv(Mdiv::default()));
            let score = doc.append(mdiv, NodeKind::Score);
            doc.append(score, NodeKind::ScoreDef);
            let section = doc.append(score, NodeKind::Section);
            measure(&mut doc, section, "1");
            doc.append(section, NodeKind::Sb);
            let nested = doc.append(section, NodeKind::Section);
            let ending = doc.append(nested, NodeKind::Ending(Ending::default()));
            measure(&mut doc, ending, "2");
            doc.append(nested, NodeKind::Ending(Ending::default()));
        }
        let expected = logical_outline(&doc, doc.root());

        convert_document(&mut doc);
        let page = doc.pages()[0];

        assert_eq!(page_based_outline(&doc, page).unwrap(), expected);
    }

    #[test]
    fn test_unbalanced_milestones_are_reported() {
        let mut doc = Document::new();
        let page = doc.append(doc.root(), NodeKind::Page);
        let system = doc.append(page, NodeKind::System);
        doc.append_with_id(system, NodeKind::Section, "s1");
        doc.append(
            system,
            NodeKind::SystemMilestoneEnd(MilestoneEnd {
                start: "s2".to_string(),
            }),
        );

        assert_eq!(
            page_based_outline(&doc, page).unwrap_err(),
            MilestoneError::Mismatched {
                expected: "s1".to_string(),
                found: "s2".to_string()
            }
        );
    }
}
