pub mod llm;
pub mod validation;
