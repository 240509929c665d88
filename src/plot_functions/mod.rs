// src/plot_functions/mod.rs

pub mod plot_time_domain;
pub mod plot_voltage_domain;
