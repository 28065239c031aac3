pub mod extraction;
pub mod reformat;
pub mod output;
