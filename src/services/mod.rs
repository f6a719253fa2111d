pub mod api;
pub mod memory;
pub mod places;
pub mod session;
