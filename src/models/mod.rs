pub mod actor;
pub mod assignment;
pub mod order;
pub mod photographer;
