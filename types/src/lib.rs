pub mod domain;
pub mod error;
pub mod scan;
pub mod time;
