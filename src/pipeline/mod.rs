pub mod extractor;
pub mod generator;
pub mod normalizer;
