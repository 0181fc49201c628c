// src/models/mod.rs

pub mod attempt;
pub mod category;
pub mod option;
pub mod question;
pub mod quiz;
pub mod user;
