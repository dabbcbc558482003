pub mod database;
pub mod notification;
pub mod qr;
pub mod repository;
