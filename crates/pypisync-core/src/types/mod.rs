mod mirror_package;
mod project;
mod requirement;

pub use mirror_package::MirrorPackage;
pub use project::{Artifact, Release};
pub use requirement::Constraint;
