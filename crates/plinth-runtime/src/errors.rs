//! Errors raised while evaluating outputs at runtime.

use plinth_core::BlueprintError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// An intrinsic function could not be resolved against live instances.
    #[error("{function} function evaluation failed: {message}")]
    FunctionEvaluation { function: String, message: String },

    /// The node-instance provider failed.
    #[error("Node instance provider failed: {0}")]
    Provider(String),

    /// A function value in the outputs is malformed.
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
}

impl RuntimeError {
    pub fn function_evaluation(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FunctionEvaluation {
            function: function.into(),
            message: message.into(),
        }
    }
}
