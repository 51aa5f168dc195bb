pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod rest;

#[cfg(test)]
pub(crate) mod test_support;
