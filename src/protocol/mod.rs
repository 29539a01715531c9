pub(crate) mod error_shapes;
pub mod grok;
pub mod openai;
