use crate::components::NotificationStack;
use crate::pages::{AdminToolsPage, EditorPage, ProjectPage};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext(AppState::new()));

    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!(":neighborhood/:project/admin/tools") view=AdminToolsPage />
                <Route path=path!(":neighborhood/:project/:app/edit") view=EditorPage />
                <Route path=path!(":neighborhood/:project") view=ProjectPage />
            </Routes>
        </Router>
        <NotificationStack />
    }
}
