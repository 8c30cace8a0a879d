pub mod request_db;
pub mod rest;
