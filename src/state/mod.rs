use crate::api::HttpClient;
use crate::config::EnvConfig;
use crate::csrf::CsrfGuard;
use crate::notify::Notifier;
use std::rc::Rc;

/// Services shared by every component, built once at start-up.
#[derive(Clone)]
pub(crate) struct Runtime {
    pub config: Rc<EnvConfig>,
    pub notifier: Notifier,
    pub csrf: Rc<CsrfGuard>,
    pub http: HttpClient,
}

impl Runtime {
    pub fn new(config: EnvConfig) -> Self {
        // `spawn_local` needs a running executor and nothing here calls
        // `mount_to_body`. Errors only when one is already installed.
        let _ = any_spawner::Executor::init_wasm_bindgen();
        let notifier = Notifier::new(config.toast_duration_ms);
        let csrf = Rc::new(CsrfGuard::new(&config, notifier.clone()));
        let http = HttpClient::new(csrf.clone());
        Self {
            config: Rc::new(config),
            notifier,
            csrf,
            http,
        }
    }
}
