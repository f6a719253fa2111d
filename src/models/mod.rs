pub mod destination;
pub mod photo;
pub mod trip;
pub mod user;
