pub mod annotate;
pub mod background;
pub mod difference;
pub mod frame;
pub mod persistence;
pub mod preprocessor;
pub mod region;
pub mod region_extractor;
