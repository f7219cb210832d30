pub mod artifact;
pub mod preferences;
pub mod remote;
