pub mod evaluator;
mod transcript;
