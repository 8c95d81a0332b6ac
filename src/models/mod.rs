pub mod booking;
pub mod driver;
pub mod quote;
pub mod vehicle;
