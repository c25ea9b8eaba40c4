pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod model;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod storage;
