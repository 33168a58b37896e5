pub mod error;
pub mod geometry;
pub mod input;
pub mod inspect;
pub mod registry;
pub mod reproject;
pub mod settings;
pub mod simplify;
pub mod surface;
pub mod upload;
pub mod util;
pub mod worker;
