pub mod health;
pub mod merge;
pub mod synthesis;

pub use merge::MergeController;
pub use synthesis::SynthesisController;
