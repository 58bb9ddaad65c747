pub mod llm;
mod openai;
mod openai_types;
#[cfg(test)]
pub mod test_provider;
