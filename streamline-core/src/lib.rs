//! Streamline Core
//!
//! Provider-agnostic resource model for declaring infrastructure and
//! synthesising it into a deployable template

pub mod differ;
pub mod graph;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod stack;
pub mod template;

pub use provider::{Provider, ProviderError, ProviderResult};
pub use resource::{Resource, ResourceId, Value};
pub use stack::Stack;
pub use template::{SynthError, Template, synth};
