pub mod audit;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod lifecycle;
pub mod markers;
pub mod ports;
pub mod report;
pub mod segment;
pub mod value_objects;
