pub mod catalog;
pub mod config;
pub mod journal;
pub mod registry;
pub mod scoring;
pub mod seed;
pub mod store;
pub mod web;
