// ABOUTME: Build stage: method resolution and image building.
// ABOUTME: Turns a fetched working directory into a tagged container image.

pub mod image;
pub mod method;

pub use image::{ImageBuildError, build, build_context};
pub use method::{CONTAINER_PORT, MethodError, ResolvedMethod, resolve};
