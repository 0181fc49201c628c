// src/handlers/mod.rs

pub mod attempt;
pub mod auth;
pub mod category;
pub mod dashboard;
pub mod option;
pub mod question;
pub mod quiz;
