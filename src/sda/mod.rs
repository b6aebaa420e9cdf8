pub mod audit;
pub mod catalog;
pub mod client;
pub mod config;
pub mod controller;
pub mod poll;
pub mod subjects;
