pub mod address;
pub mod sanitize;
