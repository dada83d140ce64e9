//! Pass driver
//!
//! Runs the passes over a document in a fixed order: page-based conversion,
//! sounding pitch, transposition, cast-off. Each pass sees the result of the
//! previous one. A pass that stops its walk fails the run with
//! [`TransformError::PassAborted`]; the tree may then be partly rewritten.

pub mod errors;
pub mod options;

pub use errors::{Result, TransformError};
pub use options::PipelineOptions;

use serde::Serialize;

use crate::converters::{cast_off, page_based, CastOffOptions, CastOffSummary};
use crate::functor::FunctorCode;
use crate::models::{Document, DocumentTree, NodeClass};
use crate::transposition::{TransposeFunctor, TranspositionRequest};

/// Outcome of the page-based conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBasedReport {
    /// `false` when the document already was page-based
    pub converted: bool,
    pub systems: usize,
}

/// Outcome of a transposition pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransposeReport {
    /// Elements rewritten
    pub transposed: usize,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub page_based: PageBasedReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sounding_pitch: Option<TransposeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transposition: Option<TransposeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_off: Option<CastOffReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastOffReport {
    pub systems: usize,
    pub segments: usize,
}

impl From<CastOffSummary> for CastOffReport {
    fn from(summary: CastOffSummary) -> Self {
        Self {
            systems: summary.systems,
            segments: summary.segments,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every configured pass
    pub fn run(&self, doc: &mut Document) -> Result<PipelineReport> {
        // fail on a bad request before anything is rewritten
        let request = self
            .options
            .transpose
            .as_deref()
            .map(str::parse::<TranspositionRequest>)
            .transpose()?;

        let mut report = PipelineReport {
            page_based: Self::convert_to_page_based(doc),
            ..Default::default()
        };

        if self.options.transpose_to_sounding_pitch {
            report.sounding_pitch = Some(Self::transpose_to_sounding_pitch(doc)?);
        }

        if let Some(request) = request {
            report.transposition = Some(Self::run_transposition(
                doc,
                request,
                self.options.selected_mdiv.as_deref(),
            )?);
        }

        if self.options.cast_off_mensural {
            let options = CastOffOptions {
                to_measured: self.options.mensural_to_measure,
            };
            report.cast_off = Some(Self::convert_to_cast_off_mensural(doc, options)?.into());
        }

        log::info!("Pipeline finished: {:?}", report);
        Ok(report)
    }

    /// Run every configured pass over a document in its JSON exchange form
    pub fn run_json(&self, json: &str) -> Result<(String, PipelineReport)> {
        let tree: DocumentTree = serde_json::from_str(json)?;
        let mut doc = Document::from_tree(&tree)?;
        let report = self.run(&mut doc)?;
        let out = serde_json::to_string(&doc.to_tree())?;
        Ok((out, report))
    }

    /// Move the logical structure into pages and systems
    pub fn convert_to_page_based(doc: &mut Document) -> PageBasedReport {
        match page_based::convert_document(doc) {
            Some(systems) => {
                if systems == 0 {
                    log::warn!("Page-based conversion produced no system; nothing to render");
                } else {
                    log::debug!("Page-based conversion created {} systems", systems);
                }
                PageBasedReport {
                    converted: true,
                    systems,
                }
            }
            None => {
                let systems = doc
                    .pages()
                    .iter()
                    .map(|&page| {
                        doc.children(page)
                            .iter()
                            .filter(|&&c| doc.class(c) == NodeClass::System)
                            .count()
                    })
                    .sum();
                log::debug!("Document is already page-based");
                PageBasedReport {
                    converted: false,
                    systems,
                }
            }
        }
    }

    /// Cut the unmeasured content of a page-based document into measures
    pub fn convert_to_cast_off_mensural(
        doc: &mut Document,
        options: CastOffOptions,
    ) -> Result<CastOffSummary> {
        let summary = cast_off::convert_document(doc, options).ok_or(TransformError::NotPageBased)?;
        log::debug!(
            "Cast-off produced {} measures in {} systems",
            summary.segments,
            summary.systems
        );
        Ok(summary)
    }

    /// Transpose by a request string, optionally within one movement
    pub fn transpose(
        doc: &mut Document,
        request: &str,
        selected_mdiv: Option<&str>,
    ) -> Result<TransposeReport> {
        let request: TranspositionRequest = request.parse()?;
        Self::run_transposition(doc, request, selected_mdiv)
    }

    fn run_transposition(
        doc: &mut Document,
        request: TranspositionRequest,
        selected_mdiv: Option<&str>,
    ) -> Result<TransposeReport> {
        let mut functor = TransposeFunctor::new(request);
        if let Some(selected) = selected_mdiv {
            let is_mdiv = doc
                .find_by_xml_id(selected)
                .is_some_and(|id| doc.class(id) == NodeClass::Mdiv);
            if !is_mdiv {
                log::warn!("No movement '{}'; nothing transposed", selected);
                return Ok(TransposeReport::default());
            }
            functor = functor.with_selected_mdiv(selected);
        }

        let root = doc.root();
        if doc.process(root, &mut functor) == FunctorCode::Stop {
            return Err(TransformError::PassAborted { pass: "transpose" });
        }
        Ok(TransposeReport {
            transposed: functor.transposed_count(),
        })
    }

    /// Rewrite transposing staves at sounding pitch
    pub fn transpose_to_sounding_pitch(doc: &mut Document) -> Result<TransposeReport> {
        let mut functor = TransposeFunctor::to_sounding_pitch();
        let root = doc.root();
        if doc.process(root, &mut functor) == FunctorCode::Stop {
            return Err(TransformError::PassAborted {
                pass: "transpose_to_sounding_pitch",
            });
        }
        Ok(TransposeReport {
            transposed: functor.transposed_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeySig, Mdiv, NodeKind};

    fn doc_with_key(sig: i32) -> Document {
        let mut doc = Document::new();
        let mdiv = doc.append(doc.root(), NodeKind::Mdiv(Mdiv::default()));
        let score = doc.append(mdiv, NodeKind::Score);
        let score_def = doc.append(score, NodeKind::ScoreDef);
        doc.append(score_def, NodeKind::KeySig(KeySig::new(sig)));
        doc.append(score, NodeKind::Section);
        doc
    }

    #[test]
    fn test_bad_request_fails_before_rewriting() {
        let mut doc = doc_with_key(0);
        let before = doc.to_tree();
        let pipeline = Pipeline::new(PipelineOptions {
            transpose: Some("Q7".to_string()),
            ..Default::default()
        });

        let err = pipeline.run(&mut doc).unwrap_err();
        assert!(matches!(err, TransformError::InvalidTransposition(_)));
        assert_eq!(doc.to_tree(), before);
    }

    #[test]
    fn test_stop_becomes_pass_aborted() {
        let mut doc = doc_with_key(10);
        let err = Pipeline::transpose(&mut doc, "Eb", None).unwrap_err();
        assert!(matches!(err, TransformError::PassAborted { pass: "transpose" }));
    }

    #[test]
    fn test_cast_off_needs_page_based_document() {
        let mut doc = doc_with_key(0);
        let err = Pipeline::convert_to_cast_off_mensural(&mut doc, CastOffOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::NotPageBased));
    }

    #[test]
    fn test_unknown_movement_reports_nothing_transposed() {
        let mut doc = doc_with_key(0);
        let report = Pipeline::transpose(&mut doc, "M2", Some("mdiv-9")).unwrap();
        assert_eq!(report, TransposeReport::default());
    }

    #[test]
    fn test_run_json_rejects_bad_documents() {
        let pipeline = Pipeline::default();
        assert!(matches!(
            pipeline.run_json("{not json").unwrap_err(),
            TransformError::Json(_)
        ));
        assert!(matches!(
            pipeline.run_json(r#"{"element": "section"}"#).unwrap_err(),
            TransformError::InvalidDocument(_)
        ));
    }

    #[test]
    fn test_run_reports_each_pass() {
        let mut doc = doc_with_key(-1);
        let pipeline = Pipeline::new(PipelineOptions {
            transpose: Some("M2".to_string()),
            cast_off_mensural: true,
            ..Default::default()
        });

        let report = pipeline.run(&mut doc).unwrap();

        assert_eq!(
            report.page_based,
            PageBasedReport {
                converted: true,
                systems: 1
            }
        );
        assert_eq!(report.transposition, Some(TransposeReport { transposed: 1 }));
        assert_eq!(
            report.cast_off,
            Some(CastOffReport {
                systems: 1,
                segments: 0
            })
        );
        assert_eq!(report.sounding_pitch, None);
    }
}
