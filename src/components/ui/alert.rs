use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::tw_merge;

/// Colour of a notice; also exposed as `data-tone` for styling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum AlertTone {
    #[default]
    Info,
    Confirm,
    Error,
}

#[component]
pub fn Alert(
    #[prop(into, optional)] class: String,
    #[prop(optional)] tone: AlertTone,
    children: Children,
) -> impl IntoView {
    let tone_class = match tone {
        AlertTone::Info => "border-border",
        AlertTone::Confirm => "border-success/40",
        AlertTone::Error => "border-destructive/40 text-destructive",
    };
    let merged_class = tw_merge!(
        "relative w-full rounded-lg border bg-background px-4 py-3 text-sm shadow-sm",
        tone_class,
        class
    );

    view! {
        <div data-name="Alert" data-tone=tone.as_ref().to_string() role="status" class=merged_class>
            {children()}
        </div>
    }
}

clx! {AlertDescription, p, "text-sm [&_p]:leading-relaxed"}
