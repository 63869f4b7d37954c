pub mod board;
pub mod config;
pub mod error;
pub mod feature;
pub mod feedback;
pub mod io;
pub mod issues;
pub mod local;
pub mod milestone;
pub mod paths;
pub mod profile;
pub mod provider;
pub mod reconcile;
pub mod review;
pub mod sheet;
pub mod source;
pub mod status;
pub mod types;

pub use error::{Result, RoadmapError};
