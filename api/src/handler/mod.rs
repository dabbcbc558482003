pub mod access;
pub mod amenity;
pub mod authorization;
pub mod gate;
pub mod health;
pub mod reservation;
