pub mod board;
pub mod booking;
pub mod lifecycle;
pub mod pricing;
