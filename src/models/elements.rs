//! Node kinds of the score tree and the attributes the passes read or write
//!
//! Only attributes consumed by the tree rewrites are modelled; everything a
//! renderer needs beyond that is carried by other stages.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

use super::pitch::{key_alteration, Accidental, Mode, PitchName};

/// Exact musical time in whole-note units
pub type Time = Ratio<i64>;

/// Movement (`<mdiv>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mdiv {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Staff definition (`<staffDef>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDef {
    pub n: i32,
    /// Written-to-sounding displacement in semitones (`@trans.semi`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_semi: Option<i32>,
    /// Written-to-sounding displacement in diatonic steps (`@trans.diat`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_diat: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl StaffDef {
    pub fn new(n: i32) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    pub fn with_transposition(n: i32, trans_diat: Option<i32>, trans_semi: i32) -> Self {
        Self {
            n,
            trans_semi: Some(trans_semi),
            trans_diat,
            label: None,
        }
    }

    pub fn has_transposition(&self) -> bool {
        self.trans_semi.is_some()
    }
}

/// Ending (`<ending>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ending {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
}

/// Editorial wrapper element names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorialKind {
    App,
    Lem,
    Rdg,
    Choice,
    Corr,
    Sic,
    Orig,
    Reg,
    Add,
    Del,
    Supplied,
    Unclear,
}

/// Editorial wrapper (`<app>`, `<rdg>`, `<choice>`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorialElement {
    pub name: EditorialKind,
}

/// End marker of a milestone pair; `start` is the xml:id of the begin node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneEnd {
    pub start: String,
}

/// Barline rendition (`@form`, `@right`)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BarRendition {
    #[default]
    Single,
    Dbl,
    End,
    Rptstart,
    Rptend,
    Dashed,
    Dotted,
    Invis,
}

/// Measure (`<measure>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// `false` for the single unmeasured container of mensural content
    #[serde(default = "default_true")]
    pub measured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<BarRendition>,
}

fn default_true() -> bool {
    true
}

impl Measure {
    pub fn measured(n: Option<String>) -> Self {
        Self {
            n,
            measured: true,
            right: None,
        }
    }

    pub fn unmeasured() -> Self {
        Self {
            n: None,
            measured: false,
            right: None,
        }
    }
}

/// Staff (`<staff>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub n: i32,
}

/// Layer (`<layer>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub n: i32,
}

/// Barline (`<barLine>`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarLine {
    #[serde(default)]
    pub form: BarRendition,
}

/// Note (`<note>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub pname: PitchName,
    pub oct: i32,
    /// Written accidental
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accid: Option<Accidental>,
    /// Gestural (sounding, not displayed) accidental
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accid_ges: Option<Accidental>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<Time>,
}

impl Note {
    pub fn new(pname: PitchName, oct: i32) -> Self {
        Self {
            pname,
            oct,
            accid: None,
            accid_ges: None,
            dur: None,
        }
    }

    pub fn with_accid(mut self, accid: Accidental) -> Self {
        self.accid = Some(accid);
        self
    }

    pub fn with_accid_ges(mut self, accid: Accidental) -> Self {
        self.accid_ges = Some(accid);
        self
    }

    pub fn with_dur(mut self, dur: Time) -> Self {
        self.dur = Some(dur);
        self
    }

    /// Sounding alteration: written, else gestural, else what `key_fifths` implies
    pub fn alteration_in_key(&self, key_fifths: i32) -> i32 {
        self.accid
            .or(self.accid_ges)
            .map(Accidental::alteration)
            .unwrap_or_else(|| key_alteration(key_fifths, self.pname))
    }
}

/// Rest (`<rest>`); `ploc`/`oloc` give an explicit vertical position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ploc: Option<PitchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oloc: Option<i32>,
}

/// Chord (`<chord>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<Time>,
}

/// Clef (`<clef>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clef {
    pub shape: String,
    pub line: u8,
}

/// Key signature (`<keySig>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySig {
    /// Circle-of-fifths count: positive sharps, negative flats
    pub sig: i32,
    /// Explicit tonic, when encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pname: Option<PitchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accid: Option<Accidental>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// `sig` before the last transposition; an enharmonic return goes back to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sig: Option<i32>,
}

impl KeySig {
    pub fn new(sig: i32) -> Self {
        Self {
            sig,
            ..Default::default()
        }
    }
}

/// Harmony annotation (`<harm>`), e.g. `C#m7/G#`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harm {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<i32>,
}

/// Every node kind of the score tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "camelCase")]
pub enum NodeKind {
    Doc,
    Pages,
    Page,
    System,
    Mdiv(Mdiv),
    Score,
    ScoreDef,
    StaffGrp,
    StaffDef(StaffDef),
    Section,
    Ending(Ending),
    Editorial(EditorialElement),
    Pb,
    Sb,
    SystemMilestoneEnd(MilestoneEnd),
    PageMilestoneEnd(MilestoneEnd),
    Measure(Measure),
    Staff(Staff),
    Layer(Layer),
    BarLine(BarLine),
    Note(Note),
    Rest(Rest),
    Chord(Chord),
    Ligature,
    Clef(Clef),
    KeySig(KeySig),
    Harm(Harm),
}

/// Field-less discriminant of [`NodeKind`], used for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Doc,
    Pages,
    Page,
    System,
    Mdiv,
    Score,
    ScoreDef,
    StaffGrp,
    StaffDef,
    Section,
    Ending,
    Editorial,
    Pb,
    Sb,
    SystemMilestoneEnd,
    PageMilestoneEnd,
    Measure,
    Staff,
    Layer,
    BarLine,
    Note,
    Rest,
    Chord,
    Ligature,
    Clef,
    KeySig,
    Harm,
}

impl NodeKind {
    pub fn class(&self) -> NodeClass {
        match self {
            NodeKind::Doc => NodeClass::Doc,
            NodeKind::Pages => NodeClass::Pages,
            NodeKind::Page => NodeClass::Page,
            NodeKind::System => NodeClass::System,
            NodeKind::Mdiv(_) => NodeClass::Mdiv,
            NodeKind::Score => NodeClass::Score,
            NodeKind::ScoreDef => NodeClass::ScoreDef,
            NodeKind::StaffGrp => NodeClass::StaffGrp,
            NodeKind::StaffDef(_) => NodeClass::StaffDef,
            NodeKind::Section => NodeClass::Section,
            NodeKind::Ending(_) => NodeClass::Ending,
            NodeKind::Editorial(_) => NodeClass::Editorial,
            NodeKind::Pb => NodeClass::Pb,
            NodeKind::Sb => NodeClass::Sb,
            NodeKind::SystemMilestoneEnd(_) => NodeClass::SystemMilestoneEnd,
            NodeKind::PageMilestoneEnd(_) => NodeClass::PageMilestoneEnd,
            NodeKind::Measure(_) => NodeClass::Measure,
            NodeKind::Staff(_) => NodeClass::Staff,
            NodeKind::Layer(_) => NodeClass::Layer,
            NodeKind::BarLine(_) => NodeClass::BarLine,
            NodeKind::Note(_) => NodeClass::Note,
            NodeKind::Rest(_) => NodeClass::Rest,
            NodeKind::Chord(_) => NodeClass::Chord,
            NodeKind::Ligature => NodeClass::Ligature,
            NodeKind::Clef(_) => NodeClass::Clef,
            NodeKind::KeySig(_) => NodeClass::KeySig,
            NodeKind::Harm(_) => NodeClass::Harm,
        }
    }

    /// Element name, also used as the prefix of generated xml:ids
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Pages => "pages",
            NodeKind::Page => "page",
            NodeKind::System => "system",
            NodeKind::Mdiv(_) => "mdiv",
            NodeKind::Score => "score",
            NodeKind::ScoreDef => "scoreDef",
            NodeKind::StaffGrp => "staffGrp",
            NodeKind::StaffDef(_) => "staffDef",
            NodeKind::Section => "section",
            NodeKind::Ending(_) => "ending",
            NodeKind::Editorial(e) => match e.name {
                EditorialKind::App => "app",
                EditorialKind::Lem => "lem",
                EditorialKind::Rdg => "rdg",
                EditorialKind::Choice => "choice",
                EditorialKind::Corr => "corr",
                EditorialKind::Sic => "sic",
                EditorialKind::Orig => "orig",
                EditorialKind::Reg => "reg",
                EditorialKind::Add => "add",
                EditorialKind::Del => "del",
                EditorialKind::Supplied => "supplied",
                EditorialKind::Unclear => "unclear",
            },
            NodeKind::Pb => "pb",
            NodeKind::Sb => "sb",
            NodeKind::SystemMilestoneEnd(_) => "systemMilestoneEnd",
            NodeKind::PageMilestoneEnd(_) => "pageMilestoneEnd",
            NodeKind::Measure(_) => "measure",
            NodeKind::Staff(_) => "staff",
            NodeKind::Layer(_) => "layer",
            NodeKind::BarLine(_) => "barLine",
            NodeKind::Note(_) => "note",
            NodeKind::Rest(_) => "rest",
            NodeKind::Chord(_) => "chord",
            NodeKind::Ligature => "ligature",
            NodeKind::Clef(_) => "clef",
            NodeKind::KeySig(_) => "keySig",
            NodeKind::Harm(_) => "harm",
        }
    }

    /// `@n` of a staff or layer
    pub fn staff_n(&self) -> Option<i32> {
        match self {
            NodeKind::Staff(staff) => Some(staff.n),
            NodeKind::StaffDef(staff_def) => Some(staff_def.n),
            _ => None,
        }
    }

    pub fn layer_n(&self) -> Option<i32> {
        match self {
            NodeKind::Layer(layer) => Some(layer.n),
            _ => None,
        }
    }
}
