pub mod merge;
pub mod persona;
pub mod podcast;
pub mod synthesis;
