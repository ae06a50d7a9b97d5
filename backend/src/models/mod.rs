// src/models/mod.rs

pub mod question;
pub mod submission;
pub mod user;
