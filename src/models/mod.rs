// src/models/mod.rs

pub mod assessment;
pub mod attempt;
pub mod report;
