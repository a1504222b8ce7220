use leptos::prelude::*;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

#[component]
pub fn Input(
    #[prop(into, optional)] class: String,

    #[prop(into, default = "text")] r#type: &'static str,
    #[prop(into, optional)] placeholder: String,
    #[prop(into, optional)] id: String,
    #[prop(optional, into)] min: Option<String>,
    #[prop(optional, into)] max: Option<String>,
    #[prop(optional, into)] title: Option<String>,

    // Two-way binding, wired by hand rather than with `bind:value`.
    #[prop(into)] bind_value: RwSignal<String>,

    /// Runs after `bind_value` has been updated.
    #[prop(optional)] on_change: Option<Callback<String>>,

    /// Runs with the field value when focus leaves the field.
    #[prop(optional)] on_blur: Option<Callback<String>>,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "placeholder:text-muted-foreground border-input flex h-9 w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-base shadow-xs outline-none md:text-sm",
        "focus-visible:border-ring focus-visible:ring-ring/50 focus-visible:ring-2",
        "aria-invalid:border-destructive",
        class
    );

    let value_of = |ev: &web_sys::Event| {
        ev.target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
            .map(|input| input.value())
    };

    let on_input = move |ev: web_sys::Event| {
        if let Some(v) = value_of(&ev) {
            bind_value.set(v.clone());
            if let Some(cb) = on_change {
                cb.run(v);
            }
        }
    };

    let on_focusout = move |ev: web_sys::FocusEvent| {
        if let Some(cb) = on_blur {
            if let Some(v) = value_of(&ev) {
                cb.run(v);
            }
        }
    };

    view! {
        <input
            data-name="Input"
            type=r#type
            class=merged_class
            placeholder=placeholder
            id=id
            min=min
            max=max
            title=title
            prop:value=move || bind_value.get()
            on:input=on_input
            on:blur=on_focusout
        />
    }
    .into_any()
}
