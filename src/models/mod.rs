pub mod calendar;
pub mod measurement;
pub mod profile;
