use crate::editor::MarkdownEditor;
use crate::installer::ToolInstaller;
use crate::models::ProjectContext;
use crate::navbar::NavBar;
use crate::state::{AppContext, NavSyncController};
use leptos::logging::log;
use leptos::prelude::*;
use leptos_router::hooks::use_params;
use leptos_router::params::Params;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct ProjectRouteParams {
    pub neighborhood: Option<String>,
    pub project: Option<String>,
    pub app: Option<String>,
}

impl ProjectRouteParams {
    pub(crate) fn project_context(&self) -> Option<ProjectContext> {
        let neighborhood = self.neighborhood.as_deref().filter(|s| !s.is_empty())?;
        let project = self.project.as_deref().filter(|s| !s.is_empty())?;
        Some(ProjectContext {
            neighborhood: neighborhood.to_string(),
            project: project.to_string(),
        })
    }
}

/// Binds the project in the URL to the app state and owns the nav sync
/// controller for everything rendered inside.
#[component]
fn ProjectScope(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<ProjectRouteParams>();

    let sync = NavSyncController::new(app_state.clone());
    provide_context(sync.clone());

    // Use closures so params access happens inside a reactive tracking context.
    let project = move || params.get().ok().and_then(|p| p.project_context());

    let app = app_state.0.clone();
    Effect::new(move |_| {
        let ctx = project();
        if app.project.get_untracked() == ctx {
            return;
        }
        log!("project changed: {ctx:?}");
        sync.reset();
        app.project.set(ctx.clone());
        app.nav.set(None);
        app.nav_error.set(None);
        app.admin_mode.set(false);
        if ctx.is_some() {
            sync.refresh();
        }
    });

    view! {
        <Show
            when=move || project().is_some()
            fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Unknown project"</div> }
        >
            {children()}
        </Show>
    }
}

#[component]
pub fn ProjectPage() -> impl IntoView {
    view! {
        <ProjectScope>
            <header class="border-b px-4 py-2">
                <NavBar />
            </header>
        </ProjectScope>
    }
}

#[component]
pub fn AdminToolsPage() -> impl IntoView {
    view! {
        <ProjectScope>
            <header class="border-b px-4 py-2">
                <NavBar />
            </header>
            <main class="mx-auto flex max-w-4xl flex-col gap-6 px-4 py-6">
                <ToolInstaller />
            </main>
        </ProjectScope>
    }
}

#[component]
pub fn EditorPage() -> impl IntoView {
    let params = use_params::<ProjectRouteParams>();
    let app = move || params.get().ok().and_then(|p| p.app).unwrap_or_default();

    view! {
        <ProjectScope>
            <header class="border-b px-4 py-2">
                <NavBar />
            </header>
            <main class="mx-auto max-w-4xl px-4 py-6">
                {move || {
                    let app = app();
                    view! { <MarkdownEditor name="text" app=app /> }
                }}
            </main>
        </ProjectScope>
    }
}
