pub mod cell;
pub mod error;
pub mod network;
pub mod region;
pub mod report;
pub mod segment;
pub mod settings;
pub mod topology;
