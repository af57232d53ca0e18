pub mod dialogue;
pub mod safety;
pub mod scoring;
