//! Blueprint logic errors.
//!
//! Every failure raised while resolving a blueprint maps onto exactly one
//! [`ErrorCode`]. The numeric values are asserted by conformance suites and
//! must never be renumbered.

use std::fmt;

use thiserror::Error;

/// Stable numeric code of a blueprint logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ErrorCode {
    InvalidDocument = 1,
    NonMergeableConflict = 3,
    MergeConflict = 4,
    MissingPlugins = 5,
    IllegalExplicitPlugin = 6,
    UndefinedType = 7,
    CircularImport = 8,
    UndefinedInterface = 9,
    MissingExplicitPlugin = 10,
    NoMatchingPlugin = 11,
    AmbiguousPlugin = 12,
    BadImportPath = 13,
    UndefinedParentType = 14,
    UndefinedRef = 15,
    UndefinedPolicy = 16,
    UndefinedRule = 17,
    IllegalPluginDerivation = 18,
    CircularTypeDependency = 100,
    DuplicateNodeName = 101,
    DuplicateInterface = 102,
    UnknownInput = 103,
    UnknownNode = 104,
    UnknownProperty = 105,
    IllegalFunctionScope = 106,
    InvalidFunctionArguments = 107,
    EvaluationUnsupported = 108,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A fatal violation found while resolving or validating a blueprint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlueprintError {
    #[error("Invalid document '{document}': {message}")]
    InvalidDocument { document: String, message: String },

    #[error("Failed on import: non-mergeable section '{section}' is defined differently in more than one document")]
    NonMergeableConflict { section: String },

    #[error("Failed on import: could not merge '{key}' due to conflicting values")]
    MergeConflict { key: String },

    #[error("'{owner}' declares interfaces but no plugins are defined")]
    MissingPlugins { owner: String },

    #[error("Plugin '{plugin}' bound to interface '{interface}' on '{owner}' implements interface '{implemented}'")]
    IllegalExplicitPlugin {
        owner: String,
        interface: String,
        plugin: String,
        implemented: String,
    },

    #[error("Node '{node}' references undefined type '{type_name}'")]
    UndefinedType { node: String, type_name: String },

    #[error("Circular import detected: {}", .circular_path.join(" -> "))]
    CircularImport { circular_path: Vec<String> },

    #[error("Interface '{interface}' declared on '{owner}' is not defined")]
    UndefinedInterface { owner: String, interface: String },

    #[error("Plugin '{plugin}' bound to interface '{interface}' on '{owner}' is not defined")]
    MissingExplicitPlugin {
        owner: String,
        interface: String,
        plugin: String,
    },

    #[error("No plugin implements interface '{interface}' declared on '{owner}'")]
    NoMatchingPlugin { owner: String, interface: String },

    #[error(
        "Interface '{interface}' declared on '{owner}' is implemented by more than one plugin: {}",
        .candidates.join(", ")
    )]
    AmbiguousPlugin {
        owner: String,
        interface: String,
        candidates: Vec<String>,
    },

    #[error("Failed on import: unable to read '{location}': {reason}")]
    BadImportPath { location: String, reason: String },

    #[error("Type '{type_name}' derives from undefined type '{parent}'")]
    UndefinedParentType { type_name: String, parent: String },

    #[error("Unable to resolve ref '{reference}' of '{owner}': {reason}")]
    UndefinedRef {
        owner: String,
        reference: String,
        reason: String,
    },

    #[error("Policy '{policy}' used by '{owner}' is not defined")]
    UndefinedPolicy { owner: String, policy: String },

    #[error("Rule '{rule}' in policy '{policy}' used by '{owner}' is not defined")]
    UndefinedRule {
        owner: String,
        policy: String,
        rule: String,
    },

    #[error("Plugin '{plugin}' derives from '{derived_from}' but must derive from '{expected}'")]
    IllegalPluginDerivation {
        plugin: String,
        derived_from: String,
        expected: String,
    },

    #[error("Circular type dependency: {}", .circular_dependency.join(" -> "))]
    CircularTypeDependency { circular_dependency: Vec<String> },

    #[error("Duplicate node name '{duplicate_node_name}'")]
    DuplicateNodeName { duplicate_node_name: String },

    #[error("Interface '{duplicate_interface_name}' is declared more than once on '{node_name}'")]
    DuplicateInterface {
        node_name: String,
        duplicate_interface_name: String,
    },

    #[error("{path}: get_input function references an unknown input '{input}'")]
    UnknownInput { path: String, input: String },

    #[error("{function} function node reference '{node}' does not exist")]
    UnknownNode { function: String, node: String },

    #[error("Node template property '{node}.properties.{property}' referenced from '{path}' doesn't exist")]
    UnknownProperty {
        node: String,
        property: String,
        path: String,
    },

    #[error("{message}")]
    IllegalFunctionScope {
        function: String,
        path: String,
        message: String,
    },

    #[error("Illegal arguments passed to {function} function at '{path}': {message}")]
    InvalidFunctionArguments {
        function: String,
        path: String,
        message: String,
    },

    #[error("{function} function does not support compile-time evaluation")]
    EvaluationUnsupported { function: String },
}

impl BlueprintError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDocument { .. } => ErrorCode::InvalidDocument,
            Self::NonMergeableConflict { .. } => ErrorCode::NonMergeableConflict,
            Self::MergeConflict { .. } => ErrorCode::MergeConflict,
            Self::MissingPlugins { .. } => ErrorCode::MissingPlugins,
            Self::IllegalExplicitPlugin { .. } => ErrorCode::IllegalExplicitPlugin,
            Self::UndefinedType { .. } => ErrorCode::UndefinedType,
            Self::CircularImport { .. } => ErrorCode::CircularImport,
            Self::UndefinedInterface { .. } => ErrorCode::UndefinedInterface,
            Self::MissingExplicitPlugin { .. } => ErrorCode::MissingExplicitPlugin,
            Self::NoMatchingPlugin { .. } => ErrorCode::NoMatchingPlugin,
            Self::AmbiguousPlugin { .. } => ErrorCode::AmbiguousPlugin,
            Self::BadImportPath { .. } => ErrorCode::BadImportPath,
            Self::UndefinedParentType { .. } => ErrorCode::UndefinedParentType,
            Self::UndefinedRef { .. } => ErrorCode::UndefinedRef,
            Self::UndefinedPolicy { .. } => ErrorCode::UndefinedPolicy,
            Self::UndefinedRule { .. } => ErrorCode::UndefinedRule,
            Self::IllegalPluginDerivation { .. } => ErrorCode::IllegalPluginDerivation,
            Self::CircularTypeDependency { .. } => ErrorCode::CircularTypeDependency,
            Self::DuplicateNodeName { .. } => ErrorCode::DuplicateNodeName,
            Self::DuplicateInterface { .. } => ErrorCode::DuplicateInterface,
            Self::UnknownInput { .. } => ErrorCode::UnknownInput,
            Self::UnknownNode { .. } => ErrorCode::UnknownNode,
            Self::UnknownProperty { .. } => ErrorCode::UnknownProperty,
            Self::IllegalFunctionScope { .. } => ErrorCode::IllegalFunctionScope,
            Self::InvalidFunctionArguments { .. } => ErrorCode::InvalidFunctionArguments,
            Self::EvaluationUnsupported { .. } => ErrorCode::EvaluationUnsupported,
        }
    }

    /// Ordered file identifiers of an import cycle, first equal to last.
    pub fn circular_path(&self) -> Option<&[String]> {
        match self {
            Self::CircularImport { circular_path } => Some(circular_path),
            _ => None,
        }
    }

    /// Ordered type names of a derivation cycle, first equal to last.
    pub fn circular_dependency(&self) -> Option<&[String]> {
        match self {
            Self::CircularTypeDependency {
                circular_dependency,
            } => Some(circular_dependency),
            _ => None,
        }
    }

    pub fn duplicate_node_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateNodeName {
                duplicate_node_name,
            } => Some(duplicate_node_name),
            _ => None,
        }
    }

    pub fn duplicate_interface_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateInterface {
                duplicate_interface_name,
                ..
            } => Some(duplicate_interface_name),
            _ => None,
        }
    }

    /// Node (or type, when no node instantiates it) owning a duplicate interface.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateInterface { node_name, .. } => Some(node_name),
            _ => None,
        }
    }

    pub fn invalid_document(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            document: document.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = BlueprintError> = std::result::Result<T, E>;
