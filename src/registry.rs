//! Static catalog of connector suites and their tools.
//!
//! Loaded once at process start and read-only thereafter. A structural
//! violation at load time is fatal: the process must not serve a broken
//! catalog.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a tool invocation is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Simulated in-process, no network
    Local,
    /// Forwarded to the MCP server as a `tools/call`
    Remote,
}

/// Expected JSON type of a payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }
}

/// One field of a tool's input schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: true,
        }
    }

    pub fn optional(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
        }
    }
}

/// A single invocable operation within a connector suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldSpec>,
    /// Overrides the suite's execution mode when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
}

impl Tool {
    pub fn new(name: &str, description: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            fields,
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// A named group of related tools exposed as one API partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSuite {
    pub id: String,
    pub name: String,
    pub mode: ExecutionMode,
    pub tools: Vec<Tool>,
}

impl ConnectorSuite {
    pub fn new(id: &str, name: &str, mode: ExecutionMode, tools: Vec<Tool>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            mode,
            tools,
        }
    }

    /// Tool-level override wins over the suite default
    pub fn effective_mode(&self, tool: &Tool) -> ExecutionMode {
        tool.mode.unwrap_or(self.mode)
    }

    /// Whether any tool in the suite forwards to the MCP server
    pub fn has_remote_tools(&self) -> bool {
        self.tools
            .iter()
            .any(|t| self.effective_mode(t) == ExecutionMode::Remote)
    }
}

/// Registry of connector suites, in stable declaration order
#[derive(Debug)]
pub struct ConnectorRegistry {
    suites: Vec<ConnectorSuite>,
}

impl ConnectorRegistry {
    /// Build a registry, validating structure. Errors here are startup-fatal.
    pub fn new(suites: Vec<ConnectorSuite>) -> Result<Self> {
        for suite in &suites {
            if suite.tools.is_empty() {
                return Err(BridgeError::Registry(format!(
                    "suite '{}' has no tools",
                    suite.id
                )));
            }
            for (i, tool) in suite.tools.iter().enumerate() {
                if suite.tools[..i].iter().any(|t| t.name == tool.name) {
                    return Err(BridgeError::Registry(format!(
                        "duplicate tool '{}' in suite '{}'",
                        tool.name, suite.id
                    )));
                }
            }
        }
        for (i, suite) in suites.iter().enumerate() {
            if suites[..i].iter().any(|s| s.id == suite.id) {
                return Err(BridgeError::Registry(format!(
                    "duplicate suite id '{}'",
                    suite.id
                )));
            }
        }
        Ok(Self { suites })
    }

    /// The built-in catalog served to the mobile app
    pub fn with_default_catalog() -> Result<Self> {
        Self::new(vec![
            ConnectorSuite::new(
                "fileops",
                "FileOps Suite",
                ExecutionMode::Remote,
                vec![
                    Tool::new(
                        "file_process",
                        "Process an uploaded file",
                        vec![
                            FieldSpec::required("file_name", FieldType::String),
                            FieldSpec::optional("operation", FieldType::String),
                        ],
                    )
                    .with_mode(ExecutionMode::Local),
                    Tool::new(
                        "gdrive_access",
                        "Read documents from Google Drive",
                        vec![FieldSpec::required("path", FieldType::String)],
                    ),
                ],
            ),
            ConnectorSuite::new(
                "legal_ai",
                "Legal AI Suite",
                ExecutionMode::Remote,
                vec![
                    Tool::new(
                        "legal_research",
                        "Search statutes and case law",
                        vec![
                            FieldSpec::required("query", FieldType::String),
                            FieldSpec::optional("jurisdiction", FieldType::String),
                        ],
                    ),
                    Tool::new(
                        "evidence_fusion",
                        "Cross-reference evidence sources",
                        vec![FieldSpec::required("sources", FieldType::Array)],
                    ),
                ],
            ),
            ConnectorSuite::new(
                "advanced_labs",
                "Advanced Labs",
                ExecutionMode::Remote,
                vec![
                    Tool::new(
                        "quantum_process",
                        "Run a quantum processing job",
                        vec![FieldSpec::required("input", FieldType::Object)],
                    ),
                    Tool::new(
                        "vr_simulation",
                        "Render a VR scene reconstruction",
                        vec![FieldSpec::required("scene", FieldType::String)],
                    ),
                ],
            ),
            ConnectorSuite::new(
                "case_management",
                "Case Management",
                ExecutionMode::Remote,
                vec![
                    Tool::new(
                        "memory_search",
                        "Search the case memory store",
                        vec![FieldSpec::required("query", FieldType::String)],
                    ),
                    Tool::new(
                        "case_orchestration",
                        "Coordinate case workflow steps",
                        vec![
                            FieldSpec::required("case_id", FieldType::String),
                            FieldSpec::optional("action", FieldType::String),
                        ],
                    ),
                ],
            ),
        ])
    }

    pub fn get(&self, connector_id: &str) -> Result<&ConnectorSuite> {
        self.suites
            .iter()
            .find(|s| s.id == connector_id)
            .ok_or_else(|| BridgeError::UnknownConnector(connector_id.to_string()))
    }

    /// Resolve a (suite, tool) pair or fail with the appropriate error
    pub fn lookup(&self, connector_id: &str, tool_name: &str) -> Result<(&ConnectorSuite, &Tool)> {
        let suite = self.get(connector_id)?;
        let tool = suite
            .tools
            .iter()
            .find(|t| t.name == tool_name)
            .ok_or_else(|| BridgeError::UnknownTool {
                connector: connector_id.to_string(),
                tool: tool_name.to_string(),
            })?;
        Ok((suite, tool))
    }

    /// Suites in stable declaration order, for deterministic dashboard display
    pub fn list(&self) -> &[ConnectorSuite] {
        &self.suites
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
