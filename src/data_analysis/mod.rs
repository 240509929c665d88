// src/data_analysis/mod.rs

pub mod derivative;
pub mod gains;
pub mod prepare;
pub mod regression;
pub mod track_width;
pub mod trim;
