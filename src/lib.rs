//! Kinyweb - corporate group website and content dashboard
//!
//! Public pages showcase the group's brand divisions, team and blog. A JSON
//! API under `/api` backs the dashboard used by staff to manage content.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod pages;
pub mod services;
