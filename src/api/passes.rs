//! Pass entry points
//!
//! Every function takes a document in its exchange form (`DocumentTree` as a
//! JS object) and returns `{ document, report }`. Nothing is kept between
//! calls.

use wasm_bindgen::prelude::*;

use super::helpers::{
    deserialize, document_from_js, serialize, transform_error, validate_mdiv_id,
    validation_error, PassResult,
};
use crate::converters::{logical_outline, page_based_outline, CastOffOptions, OutlineNode};
use crate::models::Document;
use crate::pipeline::{CastOffReport, Pipeline, PipelineOptions};
use crate::{wasm_info, wasm_log, wasm_warn};

/// Convert a logical document to page-based form
#[wasm_bindgen(js_name = convertToPageBased)]
pub fn convert_to_page_based(document: JsValue) -> Result<JsValue, JsValue> {
    wasm_info!("convertToPageBased called");

    let mut doc = document_from_js(document)?;
    let report = Pipeline::convert_to_page_based(&mut doc);

    if report.systems == 0 {
        wasm_warn!("Document has no movement; the page is empty");
    }
    wasm_log!("  {} systems (converted: {})", report.systems, report.converted);

    PassResult::new(&doc, report).to_js()
}

/// Cast off unmeasured mensural content into measures
///
/// The document must already be page-based.
#[wasm_bindgen(js_name = castOffMensural)]
pub fn cast_off_mensural(document: JsValue, to_measured: bool) -> Result<JsValue, JsValue> {
    wasm_info!("castOffMensural called with to_measured={}", to_measured);

    let mut doc = document_from_js(document)?;
    let summary =
        Pipeline::convert_to_cast_off_mensural(&mut doc, CastOffOptions { to_measured })
            .map_err(transform_error)?;

    wasm_log!("  {} measures", summary.segments);

    PassResult::new(&doc, CastOffReport::from(summary)).to_js()
}

/// Transpose a document, optionally only one movement
#[wasm_bindgen(js_name = transposeDocument)]
pub fn transpose_document(
    document: JsValue,
    request: &str,
    selected_mdiv: Option<String>,
) -> Result<JsValue, JsValue> {
    wasm_info!(
        "transposeDocument called: request='{}', mdiv={:?}",
        request,
        selected_mdiv
    );

    if let Some(mdiv) = &selected_mdiv {
        validate_mdiv_id(mdiv).map_err(validation_error)?;
    }

    let mut doc = document_from_js(document)?;
    let report = Pipeline::transpose(&mut doc, request, selected_mdiv.as_deref())
        .map_err(transform_error)?;

    wasm_log!("  {} elements transposed", report.transposed);

    PassResult::new(&doc, report).to_js()
}

/// Run the passes selected in `options` (a `PipelineOptions` object)
#[wasm_bindgen(js_name = runPipeline)]
pub fn run_pipeline(document: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    wasm_info!("runPipeline called");

    let options: PipelineOptions = if options.is_undefined() || options.is_null() {
        PipelineOptions::default()
    } else {
        deserialize(options, "Failed to deserialize pipeline options")?
    };
    wasm_log!("  options: {:?}", options);

    let mut doc = document_from_js(document)?;
    let report = Pipeline::new(options)
        .run(&mut doc)
        .map_err(transform_error)?;

    PassResult::new(&doc, report).to_js()
}

/// Container outline (movements, scores, sections, endings, measures)
///
/// Works on both forms; page-based documents are read through their milestones.
#[wasm_bindgen(js_name = documentOutline)]
pub fn document_outline(document: JsValue) -> Result<JsValue, JsValue> {
    wasm_info!("documentOutline called");

    let doc = document_from_js(document)?;
    let outline = outline(&doc).map_err(transform_error)?;

    serialize(&outline, "Failed to serialize outline")
}

fn outline(doc: &Document) -> crate::pipeline::Result<Vec<OutlineNode>> {
    if !doc.is_page_based() {
        return Ok(logical_outline(doc, doc.root()));
    }
    let mut out = Vec::new();
    for page in doc.pages() {
        out.extend(page_based_outline(doc, page)?);
    }
    Ok(out)
}
