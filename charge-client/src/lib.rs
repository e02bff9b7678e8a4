pub mod domain;
pub mod queries;
