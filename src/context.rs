//! Process-wide handles: settings, the ledger connection and the runtime.

use crate::error::Result;
use crate::lifecycle::LifecycleController;
use crate::model::Settings;
use crate::reconcile::Reconciler;
use crate::runtime::{ContainerRuntime, DockerCli, ImageRuntime};
use crate::storage::StateStore;
use crate::validation::{generate_token, validate_token};
use tracing::{info, warn};

pub struct AppContext<R = DockerCli> {
    pub settings: Settings,
    pub store: StateStore,
    pub runtime: R,
}

impl AppContext<DockerCli> {
    pub fn open(settings: Settings) -> Result<Self> {
        let store = StateStore::open(&settings.db_path())?;
        let runtime = DockerCli::new(settings.docker_bin.clone());
        Ok(Self {
            settings,
            store,
            runtime,
        })
    }
}

impl<R: ContainerRuntime + ImageRuntime> AppContext<R> {
    pub fn lifecycle(&self) -> LifecycleController<'_> {
        LifecycleController::new(&self.store, &self.runtime, &self.settings.token_env)
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.store, &self.runtime, &self.settings.token_env)
    }

    /// Return the stored token, generating and saving one when absent or
    /// malformed.
    pub fn ensure_token(&mut self) -> Result<String> {
        if let Some(token) = self.store.get_token()? {
            if validate_token(&token).is_ok() {
                return Ok(token);
            }
            warn!("stored token is malformed, replacing it");
        }
        let token = generate_token();
        self.store.set_token(&token)?;
        info!("generated new access token");
        Ok(token)
    }

    pub fn regenerate_token(&mut self) -> Result<String> {
        let token = generate_token();
        self.store.set_token(&token)?;
        info!("regenerated access token");
        Ok(token)
    }

    pub fn set_token(&mut self, token: &str) -> Result<()> {
        validate_token(token)?;
        self.store.set_token(token)
    }
}
