use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::tw_merge;

clx! {Tooltip, div, "inline-block relative whitespace-nowrap group/tooltip"}

#[derive(Clone, Copy, Default, strum::Display, strum::AsRefStr)]
pub enum TooltipPosition {
    #[default]
    Top,
    Bottom,
}

#[component]
pub fn TooltipContent(
    #[prop(into, optional)] class: String,
    #[prop(default = TooltipPosition::default())] position: TooltipPosition,
    children: Children,
) -> impl IntoView {
    let position_class = match position {
        TooltipPosition::Top => "left-1/2 bottom-full mb-1 -translate-x-1/2",
        TooltipPosition::Bottom => "left-1/2 top-full mt-1 -translate-x-1/2",
    };

    let tooltip_class = tw_merge!(
        "absolute opacity-0 transition-opacity duration-300 pointer-events-none group-hover/tooltip:opacity-100 z-50",
        "py-2 px-2.5 text-xs shadow-lg text-background bg-foreground/90",
        class,
        position_class,
    );

    view! {
        <div data-name="TooltipContent" data-position=position.as_ref().to_string() class=tooltip_class>
            {children()}
        </div>
    }
}
