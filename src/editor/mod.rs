use crate::state::AppContext;
use icons::{Eye, Info, X};
use leptos::ev;
use leptos::html;
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use wasm_bindgen::JsCast;

const SECTION_SELECTOR: &str = ".markdown_syntax_section";
const CRUMB_SELECTOR: &str = ".markdown_syntax_toc_crumb";
const TOC_CLASS: &str = "md_ex_toc";
const HIDDEN_CLASS: &str = "hidden_in_modal";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PreviewAction {
    Hide,
    /// Show the pane; `fetch` when the buffer changed since the last render.
    Show { fetch: bool },
}

/// Edit/preview toggle of one editor.
///
/// The buffer carries a revision that is bumped on every edit. A render is
/// requested only for a revision that has neither been rendered nor is
/// already being rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct PreviewToggle {
    active: bool,
    rendered_revision: Option<u64>,
    requested_revision: Option<u64>,
}

impl PreviewToggle {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self, revision: u64) -> PreviewAction {
        if self.active {
            self.active = false;
            return PreviewAction::Hide;
        }
        self.active = true;
        let fetch = self.rendered_revision != Some(revision)
            && self.requested_revision != Some(revision);
        if fetch {
            self.requested_revision = Some(revision);
        }
        PreviewAction::Show { fetch }
    }

    pub fn mark_rendered(&mut self, revision: u64) {
        self.rendered_revision = Some(revision);
        if self.requested_revision == Some(revision) {
            self.requested_revision = None;
        }
    }

    /// A failed render leaves nothing cached; the next activation asks again.
    pub fn mark_failed(&mut self, revision: u64) {
        if self.rendered_revision == Some(revision) {
            self.rendered_revision = None;
        }
        if self.requested_revision == Some(revision) {
            self.requested_revision = None;
        }
    }
}

/// What a server-filled pane currently shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum PaneContent {
    #[default]
    Empty,
    Loading,
    Html(String),
    Failed(String),
}

impl PaneContent {
    fn html(&self) -> String {
        match self {
            Self::Html(h) => h.clone(),
            _ => String::new(),
        }
    }

    fn status(&self) -> Option<String> {
        match self {
            Self::Loading => Some("Loading...".to_string()),
            Self::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }
}

/// Section class named by a location fragment (`#syntax-tables` → `syntax-tables`).
///
/// Only `[A-Za-z0-9_-]` after percent-decoding; anything else names no section.
pub(crate) fn section_class_from_hash(hash: &str) -> Option<String> {
    let raw = hash.strip_prefix('#').unwrap_or(hash);
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw).ok()?;
    decoded
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        .then(|| decoded.into_owned())
}

/// Index of the help section to show, given each section's classes.
/// Falls back to the table of contents.
pub(crate) fn pick_section(hash: &str, sections: &[Vec<String>]) -> Option<usize> {
    let with_class = |wanted: &str| {
        sections
            .iter()
            .position(|classes| classes.iter().any(|c| c == wanted))
    };
    section_class_from_hash(hash)
        .and_then(|wanted| with_class(&wanted))
        .or_else(|| with_class(TOC_CLASS))
}

fn elements(root: &web_sys::Element, selector: &str) -> Vec<web_sys::Element> {
    let Ok(nodes) = root.query_selector_all(selector) else {
        return vec![];
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|n| n.dyn_into::<web_sys::Element>().ok())
        .collect()
}

/// Show the help section matching `hash` inside `container` and hide the others.
pub(crate) fn apply_help_section(container: &web_sys::Element, hash: &str) {
    let sections = elements(container, SECTION_SELECTOR);
    let classes: Vec<Vec<String>> = sections
        .iter()
        .map(|el| el.class_name().split_whitespace().map(str::to_string).collect())
        .collect();
    let picked = pick_section(hash, &classes);

    for (i, el) in sections.iter().enumerate() {
        let _ = el.class_list().toggle_with_force(HIDDEN_CLASS, Some(i) != picked);
    }

    let show_crumb = picked
        .and_then(|i| classes.get(i))
        .is_some_and(|cls| !cls.iter().any(|c| c == TOC_CLASS));
    for crumb in elements(container, CRUMB_SELECTOR) {
        let _ = crumb.class_list().toggle_with_force(HIDDEN_CLASS, !show_crumb);
    }
}

fn current_hash() -> String {
    window().location().hash().unwrap_or_default()
}

fn toolbar_button_class(active: bool, disabled: bool) -> String {
    let mut classes = String::from(
        "inline-flex size-8 items-center justify-center rounded text-muted-foreground hover:bg-accent",
    );
    if active {
        classes.push_str(" active bg-accent text-foreground");
    }
    if disabled {
        classes.push_str(" disabled-for-preview opacity-50");
    }
    classes
}

/// Markdown textarea with a help lightbox and a server-rendered preview.
///
/// The text buffer is never touched by either overlay.
#[component]
pub fn MarkdownEditor(
    #[prop(into)] name: String,
    #[prop(optional, into)] initial: String,
    /// Tool the text belongs to; sent along with render requests.
    #[prop(into)] app: String,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let state = app_state.0.clone();

    let text = RwSignal::new(initial);
    let revision = RwSignal::new(0_u64);
    let preview = RwSignal::new(PreviewToggle::default());
    let pane = RwSignal::new(PaneContent::Empty);

    let help_open = RwSignal::new(false);
    let help = RwSignal::new(PaneContent::Empty);
    let help_request_id = RwSignal::new(0_u64);
    let help_ref: NodeRef<html::Div> = NodeRef::new();

    let previewing = move || preview.with(|p| p.is_active());

    let on_input = move |ev: web_sys::Event| {
        let Some(area) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
        else {
            return;
        };
        text.set(area.value());
        revision.update(|r| *r += 1);
    };

    let render_state = state.clone();
    let on_preview = move |_| {
        let rev = revision.get_untracked();
        let Some(action) = preview.try_update(|p| p.toggle(rev)) else {
            return;
        };
        if action != (PreviewAction::Show { fetch: true }) {
            return;
        }

        let Some(ctx) = render_state.project.get_untracked() else {
            pane.set(PaneContent::Failed("No project to render for.".to_string()));
            preview.update(|p| p.mark_failed(rev));
            return;
        };
        pane.set(PaneContent::Loading);

        let markdown = text.get_untracked();
        let app = app.clone();
        let api_client = render_state.api_client.get_untracked();
        spawn_local(async move {
            let res = api_client
                .markdown_to_html(&markdown, &ctx.neighborhood, &ctx.project, &app)
                .await;

            // Edited since: a newer activation owns the pane.
            if revision.get_untracked() != rev {
                preview.update(|p| p.mark_failed(rev));
                return;
            }
            match res {
                Ok(html) => {
                    pane.set(PaneContent::Html(html));
                    preview.update(|p| p.mark_rendered(rev));
                }
                Err(e) => {
                    warn!("markdown preview failed: {e}");
                    pane.set(PaneContent::Failed(format!("Preview failed: {e}")));
                    preview.update(|p| p.mark_failed(rev));
                }
            }
        });
    };

    let close_help = move || {
        help_open.set(false);
        help_request_id.update(|id| *id += 1);
    };

    let help_state = state.clone();
    let on_help = move |_| {
        // Fetched on every open.
        let request_id = help_request_id.get_untracked() + 1;
        help_request_id.set(request_id);
        help_open.set(true);
        help.set(PaneContent::Loading);
        if let Some(el) = help_ref.get_untracked() {
            el.set_inner_html("");
        }

        let api_client = help_state.api_client.get_untracked();
        spawn_local(async move {
            let res = api_client.help_html().await;
            if help_request_id.get_untracked() != request_id {
                log!("dropping stale help response");
                return;
            }
            match res {
                Ok(html) => {
                    if let Some(el) = help_ref.get_untracked() {
                        el.set_inner_html(&html);
                        apply_help_section(&el, &current_hash());
                    }
                    help.set(PaneContent::Html(String::new()));
                }
                Err(e) => {
                    warn!("loading markdown help failed: {e}");
                    help.set(PaneContent::Failed(format!("Could not load help: {e}")));
                }
            }
        });
    };

    // Fragment changes, back/forward included, re-pick the shown section.
    let hash_handle = window_event_listener(ev::hashchange, move |_ev: web_sys::HashChangeEvent| {
        if !help_open.get_untracked() {
            return;
        }
        if let Some(el) = help_ref.get_untracked() {
            apply_help_section(&el, &current_hash());
        }
    });
    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if help_open.get_untracked() && ev.key() == "Escape" {
            close_help();
        }
    });
    on_cleanup(move || {
        hash_handle.remove();
        key_handle.remove();
    });

    let on_backdrop = move |ev: web_sys::MouseEvent| {
        let on_backdrop_itself = match (ev.target(), ev.current_target()) {
            (Some(t), Some(c)) => t == c,
            _ => false,
        };
        if on_backdrop_itself {
            close_help();
        }
    };

    view! {
        <div class=move || if previewing() { "markdown-editor preview-active" } else { "markdown-editor" }>
            <div class="markdown-editor-toolbar flex gap-1 pb-1">
                <button
                    type="button"
                    title="Formatting Help"
                    class=move || toolbar_button_class(false, previewing())
                    disabled=previewing
                    on:click=on_help
                >
                    <Info />
                </button>
                <button
                    type="button"
                    title="Preview"
                    class=move || toolbar_button_class(previewing(), false)
                    on:click=on_preview
                >
                    <Eye />
                </button>
            </div>

            <textarea
                name=name
                class="w-full min-h-40 rounded-md border bg-transparent p-2 font-mono text-sm"
                readonly=previewing
                prop:value=move || text.get()
                on:input=on_input
            />

            <Show when=move || previewing() && pane.with(|p| p.status().is_some()) fallback=|| ()>
                <p class="editor-preview-status text-sm text-muted-foreground">
                    {move || pane.with(|p| p.status()).unwrap_or_default()}
                </p>
            </Show>
            <div
                class=move || if previewing() { "editor-preview editor-preview-active" } else { "editor-preview" }
                inner_html=move || pane.with(|p| p.html())
            />
        </div>

        <div
            class=move || if help_open.get() {
                "modal-backdrop fixed inset-0 z-40 flex items-center justify-center bg-black/40"
            } else {
                "modal-backdrop hidden"
            }
            on:click=on_backdrop
        >
            <div class="markdown-help-modal relative max-h-[80vh] w-full max-w-2xl overflow-auto rounded-lg bg-background p-6 shadow-lg">
                <button type="button" class="close absolute right-3 top-3" title="Close" on:click=move |_| close_help()>
                    <X />
                </button>
                <Show when=move || help.with(|h| h.status().is_some()) fallback=|| ()>
                    <p class="text-sm text-muted-foreground">{move || help.with(|h| h.status()).unwrap_or_default()}</p>
                </Show>
                <div class="markdown-help-content" node_ref=help_ref />
            </div>
        </div>
    }
}
