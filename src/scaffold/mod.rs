//! The scaffold pipeline: condition-gated, templated steps run in order when
//! a worktree is created, and the matching cleanup sequence when it is
//! removed.
//!
//! Steps are declared as [`StepConfig`](crate::config::StepConfig) records in
//! presets and `arbor.yaml`, built into [`Step`] objects by a
//! [`StepRegistry`], and executed by [`run_pipeline`] against a shared
//! [`ScaffoldContext`].

pub mod conditions;
pub mod context;
pub mod executor;
pub mod registry;
pub mod step;
pub mod steps;
pub mod template;

pub use conditions::Condition;
pub use context::ScaffoldContext;
pub use executor::{assemble_steps, run_pipeline, PipelineReport, StepOutcome, StepReport};
pub use registry::StepRegistry;
pub use step::{Step, StepOptions};
