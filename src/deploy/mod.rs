// ABOUTME: Deployment pipeline using the type state pattern.
// ABOUTME: Exports state markers, the Attempt struct, errors, and the job queue.

mod deployment;
mod error;
mod queue;
mod state;
mod transcript;
mod transitions;

pub use deployment::{Attempt, Pipeline};
pub use error::{DeployError, DeployErrorKind};
pub use queue::{DeadlineExceeded, JobQueue};
pub use state::{Accepted, ImageBuilt, MethodResolved, Released, Routed, SourceFetched};
pub use transcript::Transcript;
