pub mod cluster;
pub mod info;
pub mod scan;
pub mod stability;
