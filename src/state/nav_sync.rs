use crate::models::ProjectContext;
use crate::nav::{GroupingThreshold, MountOrder};
use crate::state::{AppContext, NotifyStatus};
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum SaveState {
    #[default]
    Idle,
    Saving,
}

/// One mount-order POST, bound to the project it was made in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingSave {
    pub project: ProjectContext,
    pub order: MountOrder,
    /// Queue generation at dispatch; answers from an older generation are ignored.
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReorderStep {
    /// Post this order now.
    Dispatch(PendingSave),
    /// A save is in flight; the order waits its turn.
    Queued,
    /// Refetch `_nav.json`.
    Refresh,
    Done,
}

/// Serializes mount-order saves: at most one POST in flight, refresh only
/// once the queue has drained.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReorderQueue {
    state: SaveState,
    generation: u64,
    queued: VecDeque<(ProjectContext, MountOrder)>,
    refresh_requested: bool,
}

impl ReorderQueue {
    pub fn state(&self) -> SaveState {
        self.state
    }

    fn dispatch(&mut self, project: ProjectContext, order: MountOrder) -> ReorderStep {
        self.state = SaveState::Saving;
        ReorderStep::Dispatch(PendingSave {
            project,
            order,
            generation: self.generation,
        })
    }

    pub fn submit(&mut self, project: ProjectContext, order: MountOrder) -> ReorderStep {
        match self.state {
            SaveState::Idle => self.dispatch(project, order),
            SaveState::Saving => {
                // Same level queued twice: only the latest order matters.
                let slot = self
                    .queued
                    .iter_mut()
                    .find(|(p, q)| *p == project && q.level == order.level);
                match slot {
                    Some(slot) => *slot = (project, order),
                    None => self.queued.push_back((project, order)),
                }
                ReorderStep::Queued
            }
        }
    }

    /// The save dispatched in `generation` finished with `ok`.
    pub fn complete(&mut self, generation: u64, ok: bool) -> ReorderStep {
        if self.state == SaveState::Idle || generation != self.generation {
            return ReorderStep::Done;
        }
        if let Some((project, next)) = self.queued.pop_front() {
            return self.dispatch(project, next);
        }

        self.state = SaveState::Idle;
        if ok || std::mem::take(&mut self.refresh_requested) {
            self.refresh_requested = false;
            ReorderStep::Refresh
        } else {
            ReorderStep::Done
        }
    }

    /// Ask for a refresh. Returns `true` if it may run now; otherwise it runs
    /// after the pending saves.
    pub fn request_refresh(&mut self) -> bool {
        match self.state {
            SaveState::Idle => true,
            SaveState::Saving => {
                self.refresh_requested = true;
                false
            }
        }
    }

    /// Forget queued orders; the save still in flight no longer counts.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SaveState::Idle;
        self.queued.clear();
        self.refresh_requested = false;
    }
}

/// What to do with a `_nav.json` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefreshVerdict {
    Apply,
    /// A newer refresh was issued; it owns the loading flag.
    Superseded,
    /// The project changed, or the tree was edited locally after the request went out.
    Stale,
}

/// State captured when a refresh is issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RefreshTicket {
    pub request_id: u64,
    pub version: u64,
    pub project: ProjectContext,
}

pub(crate) fn refresh_verdict(
    ticket: &RefreshTicket,
    latest_request_id: u64,
    current_version: u64,
    current_project: Option<&ProjectContext>,
) -> RefreshVerdict {
    if ticket.request_id != latest_request_id {
        RefreshVerdict::Superseded
    } else if current_project != Some(&ticket.project) || current_version != ticket.version {
        RefreshVerdict::Stale
    } else {
        RefreshVerdict::Apply
    }
}

/// Owns every mutation of the local nav tree.
///
/// - optimistic reorder + queued mount-order saves
/// - grouping threshold saves
/// - version-checked refreshes from `_nav.json`
#[derive(Clone)]
pub(crate) struct NavSyncController {
    app_state: AppContext,
    queue: Arc<Mutex<ReorderQueue>>,

    pub saving: RwSignal<bool>,
    pub threshold_in_progress: RwSignal<bool>,

    /// Latest refresh; older responses are ignored.
    refresh_request_id: RwSignal<u64>,
}

impl NavSyncController {
    pub fn new(app_state: AppContext) -> Self {
        Self {
            app_state,
            queue: Arc::new(Mutex::new(ReorderQueue::default())),
            saving: RwSignal::new(false),
            threshold_in_progress: RwSignal::new(false),
            refresh_request_id: RwSignal::new(0),
        }
    }

    fn project_untracked(&self) -> Option<ProjectContext> {
        self.app_state.0.project.get_untracked()
    }

    fn bump_version(&self) {
        self.app_state.0.nav_version.update(|v| *v += 1);
    }

    /// Refetch the canonical tree, unless a save is still in flight; then it
    /// runs once the saves are done.
    pub fn refresh(&self) {
        let may_run = self
            .queue
            .lock()
            .map(|mut q| q.request_refresh())
            .unwrap_or(true);
        if may_run {
            self.fetch_nav();
        } else {
            log!("nav refresh deferred until tool order is saved");
        }
    }

    fn fetch_nav(&self) {
        let Some(project) = self.project_untracked() else {
            return;
        };

        let app = self.app_state.0.clone();
        let request_id = self.refresh_request_id.get_untracked() + 1;
        self.refresh_request_id.set(request_id);
        let ticket = RefreshTicket {
            request_id,
            version: app.nav_version.get_untracked(),
            project,
        };
        let refresh_request_id = self.refresh_request_id;
        let api_client = app.api_client.get_untracked();

        app.nav_loading.set(true);
        spawn_local(async move {
            let res = api_client.get_nav(&ticket.project).await;

            let verdict = refresh_verdict(
                &ticket,
                refresh_request_id.get_untracked(),
                app.nav_version.get_untracked(),
                app.project.get_untracked().as_ref(),
            );
            match verdict {
                RefreshVerdict::Superseded => return,
                RefreshVerdict::Stale => {
                    app.nav_loading.set(false);
                    log!("dropping stale nav refresh");
                    return;
                }
                RefreshVerdict::Apply => app.nav_loading.set(false),
            }

            match res {
                Ok(tree) => {
                    app.nav.set(Some(tree));
                    app.nav_error.set(None);
                }
                Err(e) => {
                    warn!("nav refresh failed: {e}");
                    app.nav_error.set(Some(e.to_string()));
                }
            }
        });
    }

    /// The route switched projects: drop queued saves and pending refreshes.
    pub fn reset(&self) {
        if let Ok(mut q) = self.queue.lock() {
            q.reset();
        }
        self.saving.set(false);
        self.refresh_request_id.update(|id| *id += 1);
    }

    /// Apply a drag-drop result to one level and persist it.
    pub fn reorder(&self, level: Option<String>, names: Vec<String>) {
        let app = &self.app_state.0;
        let Some(project) = self.project_untracked() else {
            return;
        };

        let mut applied = None;
        app.nav.update(|t| {
            if let Some(tree) = t.as_mut() {
                applied = Some(tree.reorder_siblings(level.as_deref(), &names));
            }
        });

        let order = match applied {
            Some(Ok(order)) => order,
            Some(Err(e)) => {
                warn!("rejected tool reorder: {e}");
                app.notify(NotifyStatus::Error, format!("Error saving tool order: {e}"));
                return;
            }
            None => return,
        };
        self.bump_version();

        let step = match self.queue.lock() {
            Ok(mut q) => q.submit(project, order),
            Err(_) => return,
        };
        self.run_step(step);
    }

    fn run_step(&self, step: ReorderStep) {
        match step {
            ReorderStep::Dispatch(save) => self.dispatch_save(save),
            ReorderStep::Queued => log!("tool order queued behind a pending save"),
            ReorderStep::Refresh => self.fetch_nav(),
            ReorderStep::Done => {}
        }
    }

    fn dispatch_save(&self, save: PendingSave) {
        self.saving.set(true);
        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let res = api_client.save_mount_order(&save.project, &save.order).await;
            let app = &s2.app_state.0;

            let ok = match res {
                Ok(()) => {
                    app.notify(NotifyStatus::Confirm, "Tool order updated");
                    true
                }
                Err(e) => {
                    warn!("saving tool order failed: {e}");
                    app.notify(NotifyStatus::Error, "Error saving tool order.");
                    false
                }
            };

            let (step, state) = match s2.queue.lock() {
                Ok(mut q) => (q.complete(save.generation, ok), q.state()),
                Err(_) => (ReorderStep::Done, SaveState::Idle),
            };
            if state == SaveState::Idle {
                s2.saving.set(false);
            }
            s2.run_step(step);
        });
    }

    /// Accept a new grouping threshold locally, then persist it.
    pub fn set_threshold(&self, threshold: GroupingThreshold) {
        let Some(project) = self.project_untracked() else {
            return;
        };
        let app = self.app_state.0.clone();

        app.nav.update(|t| {
            if let Some(tree) = t.as_mut() {
                tree.set_grouping_threshold(threshold);
            }
        });
        self.bump_version();

        self.threshold_in_progress.set(true);
        let api_client = app.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let res = api_client.configure_tool_grouping(&project, threshold).await;
            s2.threshold_in_progress.set(false);

            match res {
                Ok(()) => s2.refresh(),
                Err(e) => {
                    warn!("saving grouping threshold failed: {e}");
                    app.notify(NotifyStatus::Error, "Error saving grouping threshold.");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> ProjectContext {
        ProjectContext {
            neighborhood: "p".to_string(),
            project: name.to_string(),
        }
    }

    fn order(level: Option<&str>, names: &[&str]) -> MountOrder {
        MountOrder {
            level: level.map(str::to_string),
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn dispatched(step: ReorderStep) -> PendingSave {
        match step {
            ReorderStep::Dispatch(save) => save,
            other => panic!("expected a dispatch, got {other:?}"),
        }
    }

    #[test]
    fn test_idle_submit_dispatches_then_success_refreshes() {
        let mut q = ReorderQueue::default();
        let o = order(None, &["b", "a"]);
        let save = dispatched(q.submit(project("demo"), o.clone()));
        assert_eq!(save.order, o);
        assert_eq!(save.project, project("demo"));
        assert_eq!(q.state(), SaveState::Saving);

        assert_eq!(q.complete(save.generation, true), ReorderStep::Refresh);
        assert_eq!(q.state(), SaveState::Idle);
    }

    #[test]
    fn test_failure_returns_to_idle_without_refresh() {
        let mut q = ReorderQueue::default();
        let save = dispatched(q.submit(project("demo"), order(None, &["b", "a"])));
        assert_eq!(q.complete(save.generation, false), ReorderStep::Done);
        assert_eq!(q.state(), SaveState::Idle);
    }

    #[test]
    fn test_reorder_while_saving_is_queued_and_dispatched_after() {
        let mut q = ReorderQueue::default();
        let first = dispatched(q.submit(project("demo"), order(None, &["b", "a"])));

        let second = order(None, &["a", "b"]);
        assert_eq!(q.submit(project("demo"), second.clone()), ReorderStep::Queued);
        assert_eq!(q.state(), SaveState::Saving);

        // First save done: no refresh yet, the queued order goes out.
        let next = dispatched(q.complete(first.generation, true));
        assert_eq!(next.order, second);
        assert_eq!(q.state(), SaveState::Saving);
        assert_eq!(q.complete(next.generation, true), ReorderStep::Refresh);
    }

    #[test]
    fn test_queued_orders_coalesce_per_level() {
        let mut q = ReorderQueue::default();
        let first = dispatched(q.submit(project("demo"), order(None, &["a", "b", "c"])));
        q.submit(project("demo"), order(None, &["b", "a", "c"]));
        q.submit(project("demo"), order(Some("git"), &["x", "y"]));
        let latest = order(None, &["c", "b", "a"]);
        q.submit(project("demo"), latest.clone());

        let next = dispatched(q.complete(first.generation, true));
        assert_eq!(next.order, latest);
        let next = dispatched(q.complete(next.generation, true));
        assert_eq!(next.order, order(Some("git"), &["x", "y"]));
        assert_eq!(q.complete(next.generation, true), ReorderStep::Refresh);
    }

    #[test]
    fn test_queued_order_keeps_its_project() {
        let mut q = ReorderQueue::default();
        let first = dispatched(q.submit(project("a"), order(None, &["x", "y"])));
        q.submit(project("a"), order(None, &["y", "x"]));
        // Same level in another project is a separate order.
        q.submit(project("b"), order(None, &["m", "n"]));

        let next = dispatched(q.complete(first.generation, true));
        assert_eq!(next.project, project("a"));
        assert_eq!(next.order, order(None, &["y", "x"]));
        let next = dispatched(q.complete(next.generation, true));
        assert_eq!(next.project, project("b"));
    }

    #[test]
    fn test_reset_drops_queue_and_ignores_old_answers() {
        let mut q = ReorderQueue::default();
        let old = dispatched(q.submit(project("a"), order(None, &["x", "y"])));
        q.submit(project("a"), order(None, &["y", "x"]));

        q.reset();
        assert_eq!(q.state(), SaveState::Idle);
        // The new project's refresh is not held back.
        assert!(q.request_refresh());

        let fresh = dispatched(q.submit(project("b"), order(None, &["m", "n"])));
        assert_ne!(fresh.generation, old.generation);

        // The old project's save finishing must not release anything.
        assert_eq!(q.complete(old.generation, true), ReorderStep::Done);
        assert_eq!(q.state(), SaveState::Saving);
        assert_eq!(q.complete(fresh.generation, true), ReorderStep::Refresh);
    }

    #[test]
    fn test_refresh_waits_for_pending_save() {
        let mut q = ReorderQueue::default();
        assert!(q.request_refresh());

        let save = dispatched(q.submit(project("demo"), order(None, &["b", "a"])));
        assert!(!q.request_refresh());

        // Even a failed save honours the deferred refresh.
        assert_eq!(q.complete(save.generation, false), ReorderStep::Refresh);
        assert!(q.request_refresh());
    }

    #[test]
    fn test_spurious_complete_is_ignored() {
        let mut q = ReorderQueue::default();
        assert_eq!(q.complete(0, true), ReorderStep::Done);
        assert_eq!(q.state(), SaveState::Idle);
    }

    fn ticket() -> RefreshTicket {
        RefreshTicket {
            request_id: 4,
            version: 7,
            project: project("demo"),
        }
    }

    #[test]
    fn test_refresh_applies_when_nothing_changed() {
        assert_eq!(
            refresh_verdict(&ticket(), 4, 7, Some(&project("demo"))),
            RefreshVerdict::Apply
        );
    }

    #[test]
    fn test_refresh_issued_before_local_edit_is_stale() {
        assert_eq!(
            refresh_verdict(&ticket(), 4, 8, Some(&project("demo"))),
            RefreshVerdict::Stale
        );
    }

    #[test]
    fn test_older_refresh_is_superseded() {
        assert_eq!(
            refresh_verdict(&ticket(), 5, 7, Some(&project("demo"))),
            RefreshVerdict::Superseded
        );
    }

    #[test]
    fn test_refresh_for_other_project_is_stale() {
        assert_eq!(
            refresh_verdict(&ticket(), 4, 7, Some(&project("other"))),
            RefreshVerdict::Stale
        );
        assert_eq!(refresh_verdict(&ticket(), 4, 7, None), RefreshVerdict::Stale);
    }
}
