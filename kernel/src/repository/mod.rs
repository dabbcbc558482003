pub mod access_event;
pub mod amenity;
pub mod authorization;
pub mod config;
pub mod health;
pub mod reservation;
pub mod resident;
