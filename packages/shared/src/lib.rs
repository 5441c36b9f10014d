//! Utilities shared by the Chatrelay server binary, its library and tests.

pub mod logger;
pub mod time;
