//! RepoFlow Image Build functionality
//!
//! This crate provides the build half of the deploy workflow:
//! the pre-build script hook, `docker build` invocation against a
//! language template, registry token decoding, and image publishing.

pub mod auth;
pub mod builder;
pub mod error;
pub mod publisher;
pub mod registry;
pub mod script;

pub use auth::{AuthorizationToken, TokenSource, decode_authorization_token};
pub use builder::{BuildTool, ImageBuilder};
pub use error::{BuildError, BuildResult};
pub use publisher::RegistryPublisher;
pub use registry::{DockerRegistry, ImageRegistry};
pub use script::{PreBuildStep, ShellScript};
