pub mod generator;
pub mod handlers;
pub mod jd_parser;
pub mod repository;
