pub mod auth;
pub mod calendar;
pub mod contact;
pub mod health;
pub mod measurements;
pub mod profile;
pub mod ws;
