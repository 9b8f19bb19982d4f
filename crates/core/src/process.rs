//! Process descriptions and the data exchanged with a running process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Descriptions
// ---------------------------------------------------------------------------

/// The shape of value a parameter carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Literal,
    Complex,
    BoundingBox,
}

/// A declared input or output of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescription {
    pub identifier: String,
    pub title: String,
    pub kind: ParameterKind,
    /// `0` marks an optional input. Ignored for outputs.
    pub min_occurs: u32,
}

impl ParameterDescription {
    pub fn literal(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            kind: ParameterKind::Literal,
            min_occurs: 1,
        }
    }

    pub fn complex(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::Complex,
            ..Self::literal(identifier, title)
        }
    }

    pub fn bounding_box(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::BoundingBox,
            ..Self::literal(identifier, title)
        }
    }

    pub fn optional(mut self) -> Self {
        self.min_occurs = 0;
        self
    }
}

/// Immutable description of a registered process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescription {
    pub identifier: String,
    pub title: String,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub inputs: Vec<ParameterDescription>,
    pub outputs: Vec<ParameterDescription>,
}

impl ProcessDescription {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            abstract_text: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    pub fn with_input(mut self, input: ParameterDescription) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: ParameterDescription) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn input(&self, identifier: &str) -> Option<&ParameterDescription> {
        self.inputs.iter().find(|p| p.identifier == identifier)
    }

    pub fn output(&self, identifier: &str) -> Option<&ParameterDescription> {
        self.outputs.iter().find(|p| p.identifier == identifier)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// An opaque payload flowing in or out of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataValue {
    Literal {
        value: String,
    },
    Complex {
        mime_type: String,
        content: String,
    },
    BoundingBox {
        crs: Option<String>,
        lower_corner: Vec<f64>,
        upper_corner: Vec<f64>,
    },
}

impl DataValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal { value } => Some(value),
            _ => None,
        }
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Literal { .. } => ParameterKind::Literal,
            Self::Complex { .. } => ParameterKind::Complex,
            Self::BoundingBox { .. } => ParameterKind::BoundingBox,
        }
    }
}

// ---------------------------------------------------------------------------
// Data map
// ---------------------------------------------------------------------------

/// Values keyed by parameter identifier.
///
/// Built from a [`ProcessDescription`] so every declared input and output
/// key is present from the start; a value is `None` until it is supplied or
/// produced. Executors may still write keys the description does not
/// declare, but only declared outputs are reported as results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataMap {
    entries: BTreeMap<String, Option<DataValue>>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map for one execution of `process`, validating `inputs`
    /// against the declared parameters.
    pub fn for_process(
        process: &ProcessDescription,
        mut inputs: BTreeMap<String, DataValue>,
    ) -> Result<Self, CoreError> {
        if let Some(unknown) = inputs.keys().find(|k| process.input(k).is_none()) {
            return Err(CoreError::Validation(format!(
                "Process '{}' has no input named '{unknown}'",
                process.identifier
            )));
        }

        let mut entries = BTreeMap::new();
        for input in &process.inputs {
            let value = inputs.remove(&input.identifier);
            match &value {
                None if input.min_occurs > 0 => {
                    return Err(CoreError::Validation(format!(
                        "Missing required input '{}'",
                        input.identifier
                    )));
                }
                Some(v) if v.kind() != input.kind => {
                    return Err(CoreError::Validation(format!(
                        "Input '{}' expects {:?} data",
                        input.identifier, input.kind
                    )));
                }
                _ => {}
            }
            entries.insert(input.identifier.clone(), value);
        }
        for output in &process.outputs {
            entries.entry(output.identifier.clone()).or_insert(None);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn literal(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(DataValue::as_literal)
    }

    pub fn set(&mut self, key: impl Into<String>, value: DataValue) {
        self.entries.insert(key.into(), Some(value));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Produced values for the outputs declared by `process`.
    pub fn outputs_of(&self, process: &ProcessDescription) -> BTreeMap<String, DataValue> {
        process
            .outputs
            .iter()
            .filter_map(|o| {
                self.get(&o.identifier)
                    .map(|v| (o.identifier.clone(), v.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
