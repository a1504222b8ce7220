use crate::components::ui::{Alert, AlertDescription, AlertTone};
use crate::state::{AppContext, NotifyStatus};
use icons::X;
use leptos::prelude::*;

/// The `#messages` area: transient success/error notices.
#[component]
pub fn NotificationStack() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let notifications = app_state.0.notifications;

    view! {
        <div id="messages" class="fixed right-4 bottom-4 z-50 flex w-80 flex-col gap-2">
            <For
                each=move || notifications.get()
                key=|n| n.id
                children=move |n| {
                    let id = n.id;
                    let tone = match n.status {
                        NotifyStatus::Confirm => AlertTone::Confirm,
                        NotifyStatus::Error => AlertTone::Error,
                        NotifyStatus::Info => AlertTone::Info,
                    };
                    let app_state = app_state.clone();
                    view! {
                        <Alert class=format!("notify {}", n.status) tone=tone>
                            <div class="flex items-start justify-between gap-2">
                                <AlertDescription>{n.message}</AlertDescription>
                                <button
                                    type="button"
                                    class="text-muted-foreground"
                                    aria-label="Dismiss"
                                    on:click=move |_| app_state.0.dismiss(id)
                                >
                                    <X />
                                </button>
                            </div>
                        </Alert>
                    }
                }
            />
        </div>
    }
}
