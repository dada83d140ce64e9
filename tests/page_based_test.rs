// Page-based conversion through the JSON exchange format

use score_passes_wasm::converters::{logical_outline, page_based_outline};
use score_passes_wasm::models::{Document, DocumentTree, NodeClass};
use score_passes_wasm::{Pipeline, PipelineOptions};
use serde_json::json;

fn document(value: serde_json::Value) -> Document {
    let tree: DocumentTree = serde_json::from_value(value).unwrap();
    Document::from_tree(&tree).unwrap()
}

/// Two movements with nested sections, endings and an empty section
fn logical_json() -> String {
    json!({
        "element": "doc",
        "children": [
            {
                "xmlId": "mdiv-1",
                "element": "mdiv",
                "children": [{
                    "xmlId": "score-1",
                    "element": "score",
                    "children": [
                        { "element": "scoreDef" },
                        {
                            "xmlId": "s1",
                            "element": "section",
                            "children": [
                                { "xmlId": "m1", "element": "measure", "n": "1" },
                                { "xmlId": "sb1", "element": "sb" },
                                {
                                    "xmlId": "e1",
                                    "element": "ending",
                                    "n": "1",
                                    "children": [{ "xmlId": "m2", "element": "measure", "n": "2" }]
                                },
                                {
                                    "xmlId": "e2",
                                    "element": "ending",
                                    "n": "2",
                                    "children": [{ "xmlId": "m3", "element": "measure", "n": "3" }]
                                }
                            ]
                        },
                        { "xmlId": "s2", "element": "section" }
                    ]
                }]
            },
            {
                "xmlId": "mdiv-2",
                "element": "mdiv",
                "children": [{
                    "xmlId": "score-2",
                    "element": "score",
                    "children": [
                        { "element": "scoreDef" },
                        {
                            "xmlId": "s3",
                            "element": "section",
                            "children": [
                                { "xmlId": "m4", "element": "measure", "n": "1" },
                                {
                                    "xmlId": "app1",
                                    "element": "editorial",
                                    "name": "app",
                                    "children": [{
                                        "xmlId": "lem1",
                                        "element": "editorial",
                                        "name": "lem",
                                        "children": [{ "xmlId": "m5", "element": "measure", "n": "2" }]
                                    }]
                                }
                            ]
                        }
                    ]
                }]
            }
        ]
    })
    .to_string()
}

#[test]
fn test_milestones_reconstruct_logical_nesting() {
    let input = logical_json();
    let before = document(serde_json::from_str(&input).unwrap());
    let expected = logical_outline(&before, before.root());

    let (output, report) = Pipeline::default().run_json(&input).unwrap();
    assert!(report.page_based.converted);
    assert_eq!(report.page_based.systems, 2);

    let after = document(serde_json::from_str(&output).unwrap());
    assert!(after.is_page_based());
    let pages = after.pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(page_based_outline(&after, pages[0]).unwrap(), expected);
}

#[test]
fn test_empty_section_keeps_adjacent_markers() {
    let (output, _) = Pipeline::default().run_json(&logical_json()).unwrap();
    let doc = document(serde_json::from_str(&output).unwrap());

    let start = doc.find_by_xml_id("s2").unwrap();
    let end = doc.next_sibling(start).unwrap();
    assert_eq!(doc.class(end), NodeClass::SystemMilestoneEnd);
    assert_eq!(doc.parent(start), doc.parent(end));
}

#[test]
fn test_already_page_based_document_is_left_alone() {
    let (once, _) = Pipeline::default().run_json(&logical_json()).unwrap();
    let (twice, report) = Pipeline::default().run_json(&once).unwrap();

    assert!(!report.page_based.converted);
    assert_eq!(report.page_based.systems, 2);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&once).unwrap(),
        serde_json::from_str::<serde_json::Value>(&twice).unwrap()
    );
}

#[test]
fn test_document_without_movements_gets_an_empty_page() {
    let mut doc = Document::new();
    let report = Pipeline::new(PipelineOptions::default()).run(&mut doc).unwrap();

    assert_eq!(report.page_based.systems, 0);
    let pages = doc.pages();
    assert_eq!(pages.len(), 1);
    assert!(doc.children(pages[0]).is_empty());
}
