#![forbid(unsafe_code)]

pub mod audit;
pub mod gate;
pub mod inventory;
pub mod settings;
