pub mod ffmpeg_backend;
pub mod image;
pub mod jpeg;
pub mod service;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;
