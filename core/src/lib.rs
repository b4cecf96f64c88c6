// stepflow/src/lib.rs

//! stepflow: a small asynchronous step-pipeline engine.
//!
//! A pipeline is an ordered list of named steps. Each step owns `before`,
//! `on` and `after` handlers that share one lockable context. Handlers can
//! stop the run early, steps can be optional or skipped by a condition, and a
//! type-keyed registry lets callers run "the pipeline for this context".
//!
//! ```ignore
//! let mut p = Pipeline::<MyData, MyError>::new(&[("load", false, None), ("notify", true, None)]);
//! p.on_root("load", load_step);
//! registry.register_pipeline(p);
//! registry.run(ContextData::new(MyData::default())).await?;
//! ```

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
