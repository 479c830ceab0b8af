//! plinth runtime
//!
//! Evaluates the outputs of a resolved [`plinth_core::Plan`] against the node
//! instances a deployment reports:
//!
//! - **[`evaluate_outputs`]**: resolve every `get_attribute` in an outputs
//!   mapping from instance runtime properties
//! - **[`NodeInstanceProvider`]**: where instances come from; any
//!   `Fn() -> Result<Vec<NodeInstance>, E>` qualifies
//! - **[`InstanceCache`]**: the per-call instance snapshot
//!
//! ```rust,ignore
//! use plinth_runtime::{evaluate_plan_outputs, NodeInstance, RuntimeError};
//!
//! let outputs = evaluate_plan_outputs(&plan, &|| {
//!     Ok::<_, RuntimeError>(vec![NodeInstance::new("shop.web").with_property("ip", "10.0.0.5")])
//! })?;
//! ```

mod errors;
mod outputs;

pub use errors::RuntimeError;
pub use outputs::{
    evaluate_outputs, evaluate_outputs_with, evaluate_plan_outputs, InstanceCache, NodeInstance,
    NodeInstanceProvider,
};
