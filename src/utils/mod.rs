pub mod math;
pub mod speed;
pub mod store;
