// ABOUTME: Generic deployment attempt struct parameterized by state marker.
// ABOUTME: State types carry their own data for compile-time guarantees.

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::records::{Application, RecordStore};
use crate::tls::ProvisionerSettings;
use std::path::PathBuf;

use super::state::Accepted;
use super::transcript::Transcript;

/// Shared context every pipeline stage runs against.
pub struct Pipeline<'a, R, S: RecordStore + ?Sized> {
    pub runtime: &'a R,
    pub store: &'a S,
    pub config: &'a Config,
    /// Certificate settings, resolved from config. None disables TLS work.
    pub cert: Option<ProvisionerSettings>,
    pub transcript: Transcript<'a, S>,
    pub diagnostics: Diagnostics,
}

/// A deployment attempt in progress, parameterized by its current state.
///
/// The state type parameter `St` carries stage-specific data (resolved
/// commit, image tag, container identity) directly in the state type, so a
/// stage cannot run before the stage that produces its inputs.
#[derive(Debug)]
pub struct Attempt<St> {
    pub(crate) app: Application,
    pub(crate) workdir: PathBuf,
    pub(crate) state: St,
}

impl Attempt<Accepted> {
    /// Begin an attempt for an application with an attempt-scoped checkout
    /// directory.
    pub fn new(app: Application, workdir: PathBuf) -> Self {
        Attempt {
            app,
            workdir,
            state: Accepted,
        }
    }
}

impl<St> Attempt<St> {
    pub fn app(&self) -> &Application {
        &self.app
    }

    pub fn workdir(&self) -> &PathBuf {
        &self.workdir
    }

    pub fn state(&self) -> &St {
        &self.state
    }
}
