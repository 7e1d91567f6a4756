//! Workflow IR
//!
//! The serde shape of these types is the workflow file itself: field
//! order is key order, and empty optional keys are left out.

use crate::ast::MatrixCombination;
use crate::value::Scalar;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A compiled workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowIR {
    pub name: String,

    /// Trigger events, in source order
    #[serde(
        rename = "on",
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_events",
        deserialize_with = "deserialize_events"
    )]
    pub trigger: Vec<String>,

    /// Jobs keyed by name, in declaration order
    pub jobs: IndexMap<String, JobIR>,
}

/// A compiled job
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobIR {
    #[serde(rename = "runs-on", default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    /// Target-native condition, without interpolation delimiters
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Output name to the expression reading it from a step
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyIR>,

    #[serde(default)]
    pub steps: Vec<StepIR>,
}

/// Matrix strategy, carried through unexpanded
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyIR {
    pub matrix: MatrixIR,

    #[serde(rename = "max-parallel", default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<u32>,

    #[serde(rename = "fail-fast", default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
}

/// Axes first, then the include and exclude lists
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixIR {
    #[serde(flatten)]
    pub axes: IndexMap<String, Vec<Scalar>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<MatrixCombination>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<MatrixCombination>,
}

/// A compiled step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepIR {
    /// Sequential identifier, assigned when the job declares outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Condition inherited from enclosing guard blocks
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(flatten)]
    pub action: StepAction,
}

/// What a step does
///
/// Agent comes before Uses: both are `uses:` steps, and an agent step is
/// recognized by its parameters when read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepAction {
    /// Normalized shell script
    Run {
        #[serde(rename = "run")]
        script: String,
    },

    /// Agent invocation through the configured agent action
    Agent {
        #[serde(rename = "uses")]
        action: String,
        with: AgentParams,
    },

    /// Action reference with parameters
    Uses {
        #[serde(rename = "uses")]
        action: String,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        with: IndexMap<String, Scalar>,
    },
}

/// Parameters handed to the agent action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    pub prompt: String,

    /// Compact JSON Schema of the expected output
    #[serde(rename = "output-schema")]
    pub output_schema: String,
}

/// One event is written as a scalar, several as a sequence
#[derive(Serialize)]
#[serde(untagged)]
enum EventsRef<'a> {
    Single(&'a str),
    Multiple(&'a [String]),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Events {
    Single(String),
    Multiple(Vec<String>),
}

fn serialize_events<S: Serializer>(events: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    match events {
        [event] => EventsRef::Single(event),
        events => EventsRef::Multiple(events),
    }
    .serialize(serializer)
}

fn deserialize_events<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Events::deserialize(deserializer)? {
        Events::Single(event) => vec![event],
        Events::Multiple(events) => events,
    })
}

impl WorkflowIR {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger: Vec::new(),
            jobs: IndexMap::new(),
        }
    }
}

impl StepIR {
    pub fn new(action: StepAction) -> Self {
        Self {
            id: None,
            name: None,
            condition: None,
            action,
        }
    }
}

impl StepAction {
    pub fn agent(
        action: impl Into<String>,
        prompt: impl Into<String>,
        output_schema: impl Into<String>,
    ) -> Self {
        StepAction::Agent {
            action: action.into(),
            with: AgentParams {
                prompt: prompt.into(),
                output_schema: output_schema.into(),
            },
        }
    }
}
