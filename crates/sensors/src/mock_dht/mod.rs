pub mod driver;
pub mod generator;
