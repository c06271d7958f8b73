//! HTTP request handlers

pub mod bikes;
pub mod health;
pub mod report;
pub mod search;
