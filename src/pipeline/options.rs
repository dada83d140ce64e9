use serde::{Deserialize, Serialize};

/// Which passes a [`super::Pipeline`] runs, and how
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    /// Transposition request (`M2`, `-3`, `Bb`, ...)
    pub transpose: Option<String>,

    /// Movement (mdiv xml:id) the transposition is limited to
    pub selected_mdiv: Option<String>,

    /// Rewrite transposing staves at sounding pitch before any other transposition
    pub transpose_to_sounding_pitch: bool,

    /// Cut unmeasured mensural content into measures
    pub cast_off_mensural: bool,

    /// Make the cast-off measures measured, with a final end barline
    pub mensural_to_measure: bool,
}
