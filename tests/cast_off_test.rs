// Mensural cast-off over whole documents

use score_passes_wasm::converters::element_duration;
use score_passes_wasm::models::{BarRendition, Document, DocumentTree, NodeClass, NodeId, NodeKind};
use score_passes_wasm::{Pipeline, PipelineOptions};
use serde_json::{json, Value};

/// Layer content: positive numbers are note lengths, 0 a barline
fn layer(content: &[i64]) -> Value {
    let children: Vec<Value> = content
        .iter()
        .map(|&item| {
            if item == 0 {
                json!({ "element": "barLine" })
            } else {
                json!({ "element": "note", "pname": "c", "oct": 4, "dur": [item, 1] })
            }
        })
        .collect();
    json!({ "element": "layer", "n": 1, "children": children })
}

fn unmeasured(staves: &[(i32, &[i64])]) -> Value {
    let children: Vec<Value> = staves
        .iter()
        .map(|&(n, content)| json!({ "element": "staff", "n": n, "children": [layer(content)] }))
        .collect();
    json!({ "element": "measure", "measured": false, "children": children })
}

/// `mdiv > score > (scoreDef, sections...)`, one unmeasured measure per section
fn logical_doc(sections: Vec<Value>) -> Document {
    let sections: Vec<Value> = sections
        .into_iter()
        .map(|measure| json!({ "element": "section", "children": [measure] }))
        .collect();
    let mut score_children = vec![json!({ "element": "scoreDef" })];
    score_children.extend(sections);
    let value = json!({
        "element": "doc",
        "children": [{
            "element": "mdiv",
            "children": [{ "element": "score", "children": score_children }]
        }]
    });
    let tree: DocumentTree = serde_json::from_value(value).unwrap();
    Document::from_tree(&tree).unwrap()
}

fn cast_off(doc: &mut Document, to_measured: bool) {
    let pipeline = Pipeline::new(PipelineOptions {
        cast_off_mensural: true,
        mensural_to_measure: to_measured,
        ..Default::default()
    });
    pipeline.run(doc).unwrap();
}

fn measures(doc: &Document) -> Vec<NodeId> {
    doc.descendants_of_class(doc.root(), NodeClass::Measure)
}

fn layer_lengths(doc: &Document, measure: NodeId, staff_n: i32) -> Vec<i64> {
    let staff = doc
        .find_child(measure, |k| k.staff_n() == Some(staff_n))
        .unwrap();
    let layer = doc.children(staff)[0];
    doc.children(layer)
        .iter()
        .map(|&c| element_duration(doc, c).to_integer())
        .collect()
}

#[test]
fn test_boundary_only_where_every_staff_has_a_barline() {
    // staff 1 barlines at 10 and 20, staff 2 at 10 and 25
    let mut doc = logical_doc(vec![unmeasured(&[
        (1, &[10, 0, 10, 0, 10][..]),
        (2, &[10, 0, 15, 0, 5][..]),
    ])]);

    cast_off(&mut doc, false);

    let measures = measures(&doc);
    assert_eq!(measures.len(), 2);
    assert_eq!(layer_lengths(&doc, measures[0], 1), vec![10]);
    assert_eq!(layer_lengths(&doc, measures[0], 2), vec![10]);
    assert_eq!(layer_lengths(&doc, measures[1], 1), vec![10, 10]);
    assert_eq!(layer_lengths(&doc, measures[1], 2), vec![15, 5]);
}

#[test]
fn test_measure_numbers_run_on_across_sections() {
    let mut doc = logical_doc(vec![
        unmeasured(&[(1, &[1, 0, 1, 0, 1][..])]),
        unmeasured(&[(1, &[1, 0, 1][..])]),
        unmeasured(&[(1, &[3][..])]),
    ]);

    cast_off(&mut doc, false);

    let numbers: Vec<i64> = measures(&doc)
        .iter()
        .filter_map(|&m| match doc.kind(m) {
            NodeKind::Measure(measure) => measure.n.as_deref().and_then(|n| n.parse().ok()),
            _ => None,
        })
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    assert!(numbers.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_to_measured_ends_with_a_final_barline() {
    let mut doc = logical_doc(vec![unmeasured(&[(1, &[2, 0, 2][..])])]);

    cast_off(&mut doc, true);

    let measures = measures(&doc);
    assert_eq!(measures.len(), 2);
    for &m in &measures {
        let NodeKind::Measure(measure) = doc.kind(m) else {
            panic!("not a measure");
        };
        assert!(measure.measured);
    }
    let NodeKind::Measure(last) = doc.kind(measures[1]) else {
        panic!("not a measure");
    };
    assert_eq!(last.right, Some(BarRendition::End));
    assert!(doc.descendants_of_class(doc.root(), NodeClass::BarLine).is_empty());
}

#[test]
fn test_logical_document_is_rejected_without_page_conversion() {
    let mut doc = logical_doc(vec![unmeasured(&[(1, &[1][..])])]);
    assert!(Pipeline::convert_to_cast_off_mensural(&mut doc, Default::default()).is_err());
}
