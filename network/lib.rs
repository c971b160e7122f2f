#![deny(dead_code)]
#![deny(unused_imports)]

pub mod config;
pub mod correlation;
pub mod data;
pub mod estimate;
pub mod graph;
pub mod layout;
pub mod render;
