// src/analytics/mod.rs

pub mod basic;
pub mod comparative;
pub mod distribution;
pub mod insights;
pub mod items;
pub mod materializer;
pub mod ranking;
pub mod recommendations;
pub mod stats;
pub mod student;
pub mod subject_marks;
pub mod time;
