//! Workflow type → physical storage layout.
//!
//! Every workflow keeps its artifacts under `tasks/{task_id}/` in the bucket,
//! but each one writes a different set of sub-prefixes and records into a
//! different set of tables. The layouts are static data; adding a workflow
//! means adding a `Layout` and a `WorkflowType` variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::TableNames;
use crate::error::SizeError;

pub const NOVA_TASK_TABLE: &str = "bedrock_mm_nova_video_task";
pub const TLABS_TASK_TABLE: &str = "bedrock_mm_tlabs_video_task";

const EMBEDDING_DIMENSION: u32 = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    #[default]
    FrameBased,
    ShotBased,
    NovaMme,
    Tlabs,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 4] = [
        WorkflowType::FrameBased,
        WorkflowType::ShotBased,
        WorkflowType::NovaMme,
        WorkflowType::Tlabs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowType::FrameBased => "frame_based",
            WorkflowType::ShotBased => "shot_based",
            WorkflowType::NovaMme => "nova_mme",
            WorkflowType::Tlabs => "tlabs",
        }
    }

    fn layout(self) -> &'static Layout {
        match self {
            WorkflowType::FrameBased => &FRAME_BASED,
            WorkflowType::ShotBased => &SHOT_BASED,
            WorkflowType::NovaMme => &NOVA_MME,
            WorkflowType::Tlabs => &TLABS,
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowType::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| SizeError::UnknownWorkflow(s.to_string()))
    }
}

/// Whether a prefix stores one embedding per `.json` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    Artifacts,
    PerItemVectors,
}

#[derive(Debug, Clone, Copy)]
enum TableRole {
    VideoTask,
    VideoFrame,
    VideoShot,
    VideoTranscription,
}

#[derive(Debug, Clone, Copy)]
enum TableSource {
    Configured(TableRole),
    Fixed(&'static str),
}

struct PrefixTemplate {
    label: &'static str,
    segment: &'static str,
    kind: PrefixKind,
}

struct TableTemplate {
    label: &'static str,
    source: TableSource,
}

struct Layout {
    prefixes: &'static [PrefixTemplate],
    tables: &'static [TableTemplate],
    vectors: Option<VectorSpec>,
}

const fn prefix(label: &'static str, segment: &'static str) -> PrefixTemplate {
    PrefixTemplate { label, segment, kind: PrefixKind::Artifacts }
}

const fn table(label: &'static str, source: TableSource) -> TableTemplate {
    TableTemplate { label, source }
}

static FRAME_BASED: Layout = Layout {
    prefixes: &[
        prefix("video_frame", "video_frame_/"),
        prefix("frame_outputs", "frame_outputs/"),
        prefix("transcribe", "transcribe/"),
    ],
    tables: &[
        table("task_metadata", TableSource::Configured(TableRole::VideoTask)),
        table("frame_analysis", TableSource::Configured(TableRole::VideoFrame)),
        table("transcription", TableSource::Configured(TableRole::VideoTranscription)),
    ],
    vectors: None,
};

static SHOT_BASED: Layout = Layout {
    prefixes: &[
        prefix("shot_clip", "shot_clip/"),
        prefix("shot_outputs", "shot_outputs/"),
        PrefixTemplate {
            label: "shot_vector",
            segment: "shot_vector/",
            kind: PrefixKind::PerItemVectors,
        },
        prefix("transcribe", "transcribe/"),
    ],
    tables: &[
        table("task_metadata", TableSource::Configured(TableRole::VideoTask)),
        table("shot_analysis", TableSource::Configured(TableRole::VideoShot)),
        table("transcription", TableSource::Configured(TableRole::VideoTranscription)),
    ],
    vectors: Some(VectorSpec { prefix_label: "shot_vector", dimension: EMBEDDING_DIMENSION }),
};

static NOVA_MME: Layout = Layout {
    prefixes: &[prefix("nova_mme", "nova-mme/")],
    tables: &[table("task_metadata", TableSource::Fixed(NOVA_TASK_TABLE))],
    vectors: Some(VectorSpec { prefix_label: "nova_mme", dimension: EMBEDDING_DIMENSION }),
};

static TLABS: Layout = Layout {
    prefixes: &[prefix("tlabs", "tlabs/")],
    tables: &[table("task_metadata", TableSource::Fixed(TLABS_TASK_TABLE))],
    vectors: Some(VectorSpec { prefix_label: "tlabs", dimension: EMBEDDING_DIMENSION }),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSlot {
    pub label: &'static str,
    pub key: String,
    pub kind: PrefixKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSlot {
    pub label: &'static str,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSpec {
    pub prefix_label: &'static str,
    pub dimension: u32,
}

/// The concrete prefixes and tables holding one task's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTopology {
    pub workflow: WorkflowType,
    pub prefixes: Vec<PrefixSlot>,
    pub tables: Vec<TableSlot>,
    pub vector_spec: Option<VectorSpec>,
}

impl WorkflowTopology {
    pub fn prefix(&self, label: &str) -> Option<&PrefixSlot> {
        self.prefixes.iter().find(|p| p.label == label)
    }
}

pub fn resolve(
    workflow_type: &str,
    task_id: &str,
    tables: &TableNames,
) -> Result<WorkflowTopology, SizeError> {
    let workflow: WorkflowType = workflow_type.parse()?;
    Ok(bind(workflow, task_id, tables))
}

pub fn bind(workflow: WorkflowType, task_id: &str, tables: &TableNames) -> WorkflowTopology {
    let layout = workflow.layout();
    let root = format!("tasks/{task_id}/");

    let prefixes = layout
        .prefixes
        .iter()
        .map(|p| PrefixSlot {
            label: p.label,
            key: format!("{root}{}", p.segment),
            kind: p.kind,
        })
        .collect();

    let tables = layout
        .tables
        .iter()
        .map(|t| TableSlot {
            label: t.label,
            name: table_name(t.source, tables)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
        .collect();

    WorkflowTopology {
        workflow,
        prefixes,
        tables,
        vector_spec: layout.vectors,
    }
}

fn table_name(source: TableSource, tables: &TableNames) -> Option<&str> {
    match source {
        TableSource::Fixed(name) => Some(name),
        TableSource::Configured(role) => match role {
            TableRole::VideoTask => tables.video_task.as_deref(),
            TableRole::VideoFrame => tables.video_frame.as_deref(),
            TableRole::VideoShot => tables.video_shot.as_deref(),
            TableRole::VideoTranscription => tables.video_transcription.as_deref(),
        },
    }
}
