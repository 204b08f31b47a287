pub mod status;
pub mod youtube;
