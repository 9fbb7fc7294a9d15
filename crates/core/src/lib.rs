pub mod annotation;
pub mod detection;
pub mod emotion;
pub mod jobs;
pub mod pipeline;
pub mod service;
pub mod shared;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;
