use crate::components::ui::{Spinner, Tooltip, TooltipContent, TooltipPosition};
use crate::components::ui::Input;
use crate::models::{NavEntry, NavTree, DEFAULT_GROUPING_THRESHOLD};
use crate::nav::{move_within, sibling_keys, GroupingThreshold};
use crate::state::{AppContext, NavSyncController};
use icons::{Lock, LockOpen};
use leptos::prelude::*;
use wasm_bindgen::JsCast;

/// The entry being dragged, and the menu level it was picked up from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DragSource {
    pub level: Option<String>,
    pub key: String,
}

#[derive(Clone, Copy)]
struct DragContext {
    source: RwSignal<Option<DragSource>>,
}

/// Link classes in normal mode: the tool icon plus `anchored`.
pub(crate) fn link_class(item: &NavEntry) -> String {
    let mut classes = item
        .icon
        .as_deref()
        .map(|icon| format!("ui-icon-{icon}-32"))
        .unwrap_or_default();
    if item.is_anchored {
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str("anchored");
    }
    classes
}

/// New order for `level` after dropping `source` on `target`.
///
/// Drops coming from another level, and drops that change nothing, yield `None`.
pub(crate) fn drop_order(
    tree: &NavTree,
    level: Option<&str>,
    source: &DragSource,
    target: &str,
    insert_after: bool,
) -> Option<Vec<String>> {
    if source.level.as_deref() != level {
        return None;
    }
    let siblings = tree.siblings(level)?;
    let dragged = siblings.iter().find(|e| e.key() == source.key)?;
    if dragged.is_anchored {
        return None;
    }
    move_within(&sibling_keys(siblings), &source.key, target, insert_after)
}

/// Children of `item` that get their own submenu; `None` for leaves.
pub(crate) fn submenu_children(item: &NavEntry) -> Option<Vec<NavEntry>> {
    if item.has_children() {
        item.children.clone()
    } else {
        None
    }
}

fn build_menu(item: NavEntry) -> AnyView {
    let classes = link_class(&item);
    let sub_menu = submenu_children(&item).map(|children| {
        let items = children.into_iter().map(build_menu).collect_view();
        view! { <ul class="submenu">{items}</ul> }
    });

    view! {
        <li>
            <a href=item.url class=classes>
                {item.name}
            </a>
            {sub_menu}
        </li>
    }
    .into_any()
}

/// The nav bar when locked: plain nested links.
#[component]
fn NormalNavBar(items: Vec<NavEntry>) -> impl IntoView {
    let list_items = items.into_iter().map(build_menu).collect_view();

    view! { <ul class="dropdown">{list_items}</ul> }
}

fn admin_cell(item: NavEntry, level: Option<String>) -> AnyView {
    let app_state = expect_context::<AppContext>();
    let nav = app_state.0.nav;
    let sync = expect_context::<NavSyncController>();
    let drag = expect_context::<DragContext>();

    let key = item.key().to_string();
    let anchored = item.is_anchored;
    let is_submenu = level.is_some();

    let element_class = if is_submenu {
        "draggable-element submenu"
    } else {
        "draggable-element"
    };
    let item_class = if anchored {
        "tb-item tb-item-edit anchored"
    } else {
        "tb-item tb-item-edit"
    };

    let key_for_start = key.clone();
    let level_for_start = level.clone();
    let on_dragstart = move |ev: web_sys::DragEvent| {
        ev.stop_propagation();
        if anchored {
            ev.prevent_default();
            return;
        }
        if let Some(dt) = ev.data_transfer() {
            let _ = dt.set_data("text/plain", &key_for_start);
            dt.set_effect_allowed("move");
        }
        drag.source.set(Some(DragSource {
            level: level_for_start.clone(),
            key: key_for_start.clone(),
        }));
    };

    let on_dragover = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        if let Some(dt) = ev.data_transfer() {
            dt.set_drop_effect("move");
        }
    };

    let key_for_drop = key.clone();
    let level_for_drop = level.clone();
    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        ev.stop_propagation();

        let Some(source) = drag.source.get_untracked() else {
            return;
        };
        drag.source.set(None);

        // Grid layout: left or right half of the target cell.
        let insert_after = ev
            .current_target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .map(|el| el.get_bounding_client_rect())
            .map(|rect| (ev.client_x() as f64) >= rect.left() + rect.width() / 2.0)
            .unwrap_or(true);

        // Current tree, so a drop right after another one sees its result.
        let new_order = nav.with_untracked(|tree| {
            drop_order(
                tree.as_ref()?,
                level_for_drop.as_deref(),
                &source,
                &key_for_drop,
                insert_after,
            )
        });
        if let Some(names) = new_order {
            sync.reorder(level_for_drop.clone(), names);
        }
    };

    let on_dragend = move |_ev: web_sys::DragEvent| drag.source.set(None);

    let submenu = submenu_children(&item).map(|children| {
        view! { <AdminNav tools=children level=key.clone() /> }.into_any()
    });

    view! {
        <div
            class=element_class
            draggable=if anchored { "false" } else { "true" }
            on:dragstart=on_dragstart
            on:dragover=on_dragover
            on:drop=on_drop
            on:dragend=on_dragend
        >
            <div class="draggable-handle">
                <div class=item_class>
                    <a href=item.url.clone()>{item.key().to_string()}</a>
                    {submenu}
                </div>
            </div>
        </div>
    }
    .into_any()
}

/// The nav bar when unlocked: one drag-reorderable grid per menu level.
#[component]
fn AdminNav(tools: Vec<NavEntry>, #[prop(optional)] level: Option<String>) -> impl IntoView {
    let classes = if level.is_some() {
        "react-drag edit-mode submenu"
    } else {
        "react-drag edit-mode"
    };
    let cells = tools
        .into_iter()
        .map(|item| admin_cell(item, level.clone()))
        .collect_view();

    view! { <div class=classes>{cells}</div> }
}

/// Number field for the grouping threshold.
#[component]
fn GroupingThresholdControl() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let sync = expect_context::<NavSyncController>();

    let initial = app_state
        .0
        .nav
        .get_untracked()
        .map(|t| t.grouping_threshold)
        .unwrap_or(DEFAULT_GROUPING_THRESHOLD);
    let value = RwSignal::new(GroupingThreshold::clamped(initial).get().to_string());
    let in_progress = sync.threshold_in_progress;

    let on_change = Callback::new(move |raw: String| {
        // Non-numeric input is refused; the stored threshold stays as it was.
        let Some(threshold) = GroupingThreshold::parse(&raw) else {
            return;
        };
        let shown = threshold.get().to_string();
        if shown != raw.trim() {
            value.set(shown);
        }
        sync.set_threshold(threshold);
    });

    view! {
        <div id="threshold-config" class="flex items-center gap-2">
            <label for="threshold-input" class="text-sm">"Grouping Threshold"</label>
            <Tooltip>
                <Input
                    id="threshold-input"
                    r#type="number"
                    class="w-20"
                    min="1"
                    max="10"
                    bind_value=value
                    on_change=on_change
                />
                <TooltipContent position=TooltipPosition::Bottom>
                    "Number of tools allowed before grouping."
                </TooltipContent>
            </Tooltip>
            <Show when=move || in_progress.get() fallback=|| ()>
                <Spinner label="Saving grouping threshold" />
            </Show>
        </div>
    }
}

#[component]
fn ToggleAdminButton() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let admin_mode = app_state.0.admin_mode;

    view! {
        <button
            id="toggle-admin-btn"
            class="admin-toolbar-right"
            title=move || if admin_mode.get() { "Lock navigation" } else { "Edit navigation" }
            on:click=move |_| admin_mode.update(|v| *v = !*v)
        >
            {move || if admin_mode.get() {
                view! { <LockOpen /> }.into_any()
            } else {
                view! { <Lock /> }.into_any()
            }}
        </button>
    }
}

/// Project navigation bar with its admin controls.
#[component]
pub fn NavBar() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let saving = expect_context::<NavSyncController>().saving;
    provide_context(DragContext {
        source: RwSignal::new(None),
    });

    let nav = app_state.0.nav;
    let admin_mode = app_state.0.admin_mode;
    let nav_loading = app_state.0.nav_loading;
    let nav_error = app_state.0.nav_error;

    let bar = move || match nav.get() {
        Some(tree) if admin_mode.get() => view! { <AdminNav tools=tree.children /> }.into_any(),
        Some(tree) => view! { <NormalNavBar items=tree.children /> }.into_any(),
        None => view! {
            <div class="text-xs text-muted-foreground">
                {move || match nav_error.get() {
                    Some(e) => e,
                    None if nav_loading.get() => "Loading navigation...".to_string(),
                    None => String::new(),
                }}
            </div>
        }
        .into_any(),
    };

    view! {
        <div class=move || if admin_mode.get() { "nav_admin edit-mode" } else { "nav_admin" }>
            {bar}
            <div id="bar-config">
                <Show when=move || admin_mode.get() && nav.with(|n| n.is_some()) fallback=|| ()>
                    <GroupingThresholdControl />
                </Show>
            </div>
            <Show when=move || saving.get() fallback=|| ()>
                <Spinner class="size-3" label="Saving tool order" />
            </Show>
            <ToggleAdminButton />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, anchored: bool) -> NavEntry {
        NavEntry {
            name: key.to_uppercase(),
            url: format!("/p/demo/{key}/"),
            mount_point: Some(key.to_string()),
            ordinal: 0,
            is_anchored: anchored,
            tool_name: "wiki".to_string(),
            icon: Some("tool-wiki".to_string()),
            children: None,
        }
    }

    fn tree(children: Vec<NavEntry>) -> NavTree {
        NavTree {
            children,
            ..NavTree::default()
        }
    }

    fn keys(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_link_class() {
        assert_eq!(link_class(&entry("wiki", false)), "ui-icon-tool-wiki-32");
        assert_eq!(link_class(&entry("home", true)), "ui-icon-tool-wiki-32 anchored");

        let mut bare = entry("x", true);
        bare.icon = None;
        assert_eq!(link_class(&bare), "anchored");
    }

    #[test]
    fn test_only_entries_with_children_get_a_submenu() {
        assert_eq!(submenu_children(&entry("wiki", false)), None);

        let mut empty_group = entry("git", false);
        empty_group.children = Some(vec![]);
        assert_eq!(submenu_children(&empty_group), None);

        let mut group = entry("git", false);
        group.mount_point = None;
        group.children = Some(vec![entry("code", false), entry("docs", false)]);
        let kids = submenu_children(&group).expect("group has a submenu");
        assert_eq!(sibling_keys(&kids), keys(&["code", "docs"]));

        // A submenu level is keyed by its group entry.
        assert_eq!(group.key(), "GIT");
    }

    #[test]
    fn test_drop_b_before_a() {
        let t = tree(vec![entry("a", false), entry("b", false)]);
        let source = DragSource {
            level: None,
            key: "b".to_string(),
        };
        assert_eq!(drop_order(&t, None, &source, "a", false), Some(keys(&["b", "a"])));
    }

    #[test]
    fn test_drop_from_other_level_is_ignored() {
        let t = tree(vec![entry("a", false), entry("b", false)]);
        let source = DragSource {
            level: Some("git".to_string()),
            key: "b".to_string(),
        };
        assert_eq!(drop_order(&t, None, &source, "a", false), None);
        assert_eq!(drop_order(&t, Some("svn"), &source, "a", false), None);
    }

    #[test]
    fn test_drop_inside_submenu_level() {
        let mut git = entry("git", false);
        git.mount_point = None;
        git.name = "git".to_string();
        git.children = Some(vec![entry("code", false), entry("docs", false)]);
        let t = tree(vec![entry("wiki", false), git]);

        let source = DragSource {
            level: Some("git".to_string()),
            key: "docs".to_string(),
        };
        assert_eq!(
            drop_order(&t, Some("git"), &source, "code", false),
            Some(keys(&["docs", "code"]))
        );
        assert_eq!(drop_order(&t, Some("missing"), &source, "code", false), None);
    }

    #[test]
    fn test_anchored_entries_do_not_move() {
        let t = tree(vec![entry("home", true), entry("a", false)]);
        let source = DragSource {
            level: None,
            key: "home".to_string(),
        };
        assert_eq!(drop_order(&t, None, &source, "a", true), None);

        // Others may still be dropped around them.
        let source = DragSource {
            level: None,
            key: "a".to_string(),
        };
        assert_eq!(
            drop_order(&t, None, &source, "home", false),
            Some(keys(&["a", "home"]))
        );
    }
}
