pub mod entity;
pub mod error;
pub mod extract;
pub mod record;
