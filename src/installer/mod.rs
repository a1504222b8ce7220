mod validation;

use validation::{validate_draft, DraftError, MountPointStatus, MountPointValidator};

use crate::components::ui::{
    Button, ButtonVariant, Card, CardContent, CardDescription, CardList, CardTitle, Input, Spinner,
};
use crate::models::{InstallableTool, NewToolDraft};
use crate::state::{AppContext, NotifyStatus};
use leptos::logging::warn;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// `{project url}{mount point}`, as shown under the url path field.
pub(crate) fn mount_url_preview(project_url: &str, mount_point: &str) -> String {
    format!("{project_url}{mount_point}")
}

/// DOM id of a catalog entry.
pub(crate) fn tool_dom_id(name: &str) -> String {
    format!("add-new-{}", name.to_lowercase().replace(' ', "-"))
}

#[component]
fn InstallableToolItem(tool: InstallableTool, active: RwSignal<InstallableTool>) -> impl IntoView {
    let name = tool.name.clone();
    let dom_id = tool_dom_id(&tool.name);
    let is_active = {
        let name = name.clone();
        move || active.with(|a| a.name == name)
    };

    view! {
        <li
            id=dom_id
            class=move || if is_active() { "selected-tool" } else { "" }
        >
            <Button
                variant=ButtonVariant::Tool
                on:click=move |_| active.set(tool.clone())
            >
                {name.clone()}
            </Button>
        </li>
    }
}

/// Name and description of the picked tool.
#[component]
fn NewToolInfo(active: RwSignal<InstallableTool>) -> impl IntoView {
    view! {
        <div class="tool-info">
            <h1 class="text-lg font-semibold">{move || active.with(|t| t.name.clone())}</h1>
            <CardDescription>{move || active.with(|t| t.description.clone())}</CardDescription>
        </div>
    }
}

/// Catalog of installable tools plus the form for mounting a new one.
///
/// The form only validates: installing is left to the server-side admin pages.
#[component]
pub fn ToolInstaller() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let app = app_state.0.clone();

    let tools = RwSignal::new(Vec::<InstallableTool>::new());
    let tools_loading = RwSignal::new(true);
    let tools_error = RwSignal::new(None::<String>);
    let active = RwSignal::new(InstallableTool::placeholder());

    let label = RwSignal::new(String::new());
    let mount_point = RwSignal::new(String::new());
    let validator = RwSignal::new(MountPointValidator::default());
    let form_error = RwSignal::new(None::<String>);

    // Catalog: fetched once per mount.
    if let Some(project) = app.project.get_untracked() {
        let api_client = app.api_client.get_untracked();
        spawn_local(async move {
            match api_client.installable_tools(&project).await {
                Ok(list) => tools.set(list),
                Err(e) => {
                    warn!("loading installable tools failed: {e}");
                    tools_error.set(Some(e.to_string()));
                }
            }
            tools_loading.set(false);
        });
    } else {
        tools_loading.set(false);
    }

    // Picking a tool fills the form from its defaults.
    Effect::new(move |_| {
        let draft = active.with(NewToolDraft::from_tool);
        label.set(draft.mount_label);
        mount_point.set(draft.mount_point);
        validator.update(|v| v.reset());
        form_error.set(None);
    });

    let on_mount_point_change = Callback::new(move |_value: String| {
        validator.update(|v| v.reset());
        form_error.set(None);
    });

    let check_app = app.clone();
    let on_mount_point_blur = Callback::new(move |value: String| {
        let Some(ticket) = validator.try_update(|v| v.begin(&value)).flatten() else {
            return;
        };
        let Some(project) = check_app.project.get_untracked() else {
            return;
        };
        let api_client = check_app.api_client.get_untracked();
        spawn_local(async move {
            let res = api_client
                .check_mount_point(&project, &value)
                .await
                .map(|check| check.exists)
                .map_err(|e| e.to_string());
            let current = mount_point.get_untracked();
            validator.update(|v| {
                v.resolve(ticket, &current, res);
            });
        });
    });

    let submit_app = app.clone();
    let on_submit = move |_| {
        if active.with_untracked(|t| t.is_placeholder()) {
            form_error.set(Some(DraftError::NoToolSelected.to_string()));
            return;
        }
        let draft = NewToolDraft {
            mount_point: mount_point.get_untracked().trim().to_string(),
            mount_label: label.get_untracked(),
        };
        let mounted = submit_app
            .nav
            .with_untracked(|n| n.as_ref().map(|t| t.mount_points()).unwrap_or_default());
        let status = validator.with_untracked(|v| v.status().clone());

        match validate_draft(&draft, &mounted, &status) {
            Ok(()) => {
                form_error.set(None);
                submit_app.notify(
                    NotifyStatus::Info,
                    format!(
                        "\"{}\" looks good, but tools cannot be installed from this panel yet.",
                        draft.mount_label
                    ),
                );
            }
            Err(e) => form_error.set(Some(e.to_string())),
        }
    };

    let url_app = app.clone();
    let url_preview = move || {
        let base = url_app
            .project
            .with(|p| p.as_ref().map(|ctx| url_app.api_client.with(|c| c.project_url(ctx))))
            .unwrap_or_default();
        mount_point.with(|mp| mount_url_preview(&base, mp))
    };

    let warning = move || validator.with(|v| v.status().warning());
    let checking = move || validator.with(|v| *v.status() == MountPointStatus::Checking);

    view! {
        <Card>
            <CardTitle>"Click to install"</CardTitle>
            <CardContent>
                <Show when=move || !tools_loading.get() fallback=|| view! { <Spinner label="Loading tools" /> }>
                    {move || tools_error.get().map(|e| view! {
                        <p class="text-destructive text-sm">{e}</p>
                    })}
                    <CardList>
                        <For
                            each=move || tools.get()
                            key=|t| t.name.clone()
                            children=move |tool| view! { <InstallableToolItem tool=tool active=active /> }
                        />
                    </CardList>
                </Show>
            </CardContent>
        </Card>

        <Card>
            <CardContent>
                <NewToolInfo active=active />
                <Show when=move || !active.with(|t| t.is_placeholder()) fallback=|| ()>
                    <form class="add-tool-field flex flex-col gap-3" on:submit=|ev| ev.prevent_default()>
                        <label for="new-tool-label" class="text-sm font-medium">"Label"</label>
                        <Input id="new-tool-label" bind_value=label />

                        <label for="new-tool-mount-point" class="text-sm font-medium">"Url Path"</label>
                        <Input
                            id="new-tool-mount-point"
                            bind_value=mount_point
                            on_change=on_mount_point_change
                            on_blur=on_mount_point_blur
                        />
                        <div class="flex items-center gap-2 text-xs">
                            <span class="tool-form-fields text-muted-foreground">{url_preview.clone()}</span>
                            <Show when=checking fallback=|| ()>
                                <Spinner class="size-3" label="Checking url path" />
                            </Show>
                        </div>
                        <Show when=move || warning().is_some() fallback=|| ()>
                            <p class="modal-form-warning text-destructive text-sm">
                                {move || warning().unwrap_or_default()}
                            </p>
                        </Show>

                        <Show when=move || form_error.get().is_some() fallback=|| ()>
                            <p class="text-destructive text-sm">
                                {move || form_error.get().unwrap_or_default()}
                            </p>
                        </Show>

                        <Button attr:id="new-tool-submit" on:click=on_submit.clone()>
                            "Add Tool"
                        </Button>
                    </form>
                </Show>
            </CardContent>
        </Card>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_url_preview() {
        assert_eq!(
            mount_url_preview("https://forge.example.org/p/demo/", "tickets"),
            "https://forge.example.org/p/demo/tickets"
        );
        assert_eq!(
            mount_url_preview("https://forge.example.org/p/demo/", ""),
            "https://forge.example.org/p/demo/"
        );
    }

    #[test]
    fn test_tool_dom_id() {
        assert_eq!(tool_dom_id("Wiki"), "add-new-wiki");
        assert_eq!(tool_dom_id("Discussion Forum"), "add-new-discussion-forum");
    }
}
