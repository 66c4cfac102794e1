//! CLI command implementations.

pub(crate) mod inspect;
pub(crate) mod render;
pub(crate) mod template;

pub(crate) use inspect::InspectArgs;
pub(crate) use render::RenderArgs;
pub(crate) use template::TemplateArgs;
