pub mod matches;
pub mod opportunity;
pub mod profile;
