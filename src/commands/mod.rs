pub mod stock;
pub mod symbols;
pub mod trend;
