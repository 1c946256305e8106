pub mod broadcast;
pub mod media;
pub mod token;
