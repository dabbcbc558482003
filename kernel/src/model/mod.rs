pub mod access;
pub mod amenity;
pub mod authorization;
pub mod config;
pub mod id;
pub mod reservation;
pub mod resident;
pub mod role;
pub mod visitor;
pub mod window;
