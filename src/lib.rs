#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod app;
pub mod config;
pub mod curation;
pub mod dedup;
pub mod diversity;
pub mod enrichment;
pub mod model;
pub mod observability;
pub mod persist;
pub mod service;
pub mod util;
pub mod validator;
pub mod vocabulary;
