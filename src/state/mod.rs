pub(crate) mod nav_sync;

use crate::api::{ApiClient, EnvConfig};
use crate::models::{NavTree, ProjectContext};
use leptos::prelude::*;

pub(crate) use nav_sync::NavSyncController;

const NOTIFICATION_TTL_MS: u32 = 4_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum NotifyStatus {
    Confirm,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notification {
    pub id: u64,
    pub status: NotifyStatus,
    pub message: String,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// Project of the current route.
    pub project: RwSignal<Option<ProjectContext>>,

    /// Local copy of `_nav.json`; patched optimistically, replaced on refresh.
    pub nav: RwSignal<Option<NavTree>>,
    pub nav_loading: RwSignal<bool>,
    pub nav_error: RwSignal<Option<String>>,

    /// Bumped on every local mutation of `nav`; refreshes issued before a bump are stale.
    pub nav_version: RwSignal<u64>,

    /// Admin (unlocked) mode of the nav bar.
    pub admin_mode: RwSignal<bool>,

    pub notifications: RwSignal<Vec<Notification>>,
    notification_seq: RwSignal<u64>,
}

impl AppState {
    pub fn new() -> Self {
        let api_client = ApiClient::from_config(&EnvConfig::new());

        Self {
            api_client: RwSignal::new(api_client),
            project: RwSignal::new(None),
            nav: RwSignal::new(None),
            nav_loading: RwSignal::new(false),
            nav_error: RwSignal::new(None),
            nav_version: RwSignal::new(0),
            admin_mode: RwSignal::new(false),
            notifications: RwSignal::new(vec![]),
            notification_seq: RwSignal::new(0),
        }
    }

    /// Show a message in the notification area; it disappears on its own.
    pub fn notify(&self, status: NotifyStatus, message: impl Into<String>) {
        let id = self.notification_seq.get_untracked() + 1;
        self.notification_seq.set(id);
        self.notifications.update(|xs| {
            xs.push(Notification {
                id,
                status,
                message: message.into(),
            })
        });

        let notifications = self.notifications;
        gloo_timers::callback::Timeout::new(NOTIFICATION_TTL_MS, move || {
            notifications.update(|xs| xs.retain(|n| n.id != id));
        })
        .forget();
    }

    pub fn dismiss(&self, id: u64) {
        self.notifications.update(|xs| xs.retain(|n| n.id != id));
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
