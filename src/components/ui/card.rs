use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    // Tool installer panel.
    clx! {Card, div, "tool-card bg-card text-card-foreground flex flex-col gap-4 rounded-xl border py-6 shadow-sm"}
    clx! {CardTitle, div, "box-title px-6 leading-none font-semibold"}
    clx! {CardContent, div, "px-6"}
    clx! {CardDescription, p, "text-muted-foreground text-sm"}
    clx! {CardList, ul, "installable-tool-box flex flex-wrap gap-2"}
}

pub use components::*;
