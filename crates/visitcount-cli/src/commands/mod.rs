pub mod config;
pub mod estimate;
pub mod key;
pub mod reset;
pub mod run;
pub mod show;
pub mod stats;
