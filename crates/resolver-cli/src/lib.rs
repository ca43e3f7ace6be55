pub mod design;
pub mod input;
pub mod output;
pub mod runner;
