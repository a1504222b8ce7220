mod api;
mod app;
mod components;
mod editor;
mod installer;
mod models;
mod nav;
mod navbar;
mod pages;
mod session;
mod state;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::editor::apply_help_section;
    use crate::session::{read_cookie, SessionCredential};
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn html_document() -> web_sys::HtmlDocument {
        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
            .expect("document should be an HtmlDocument")
    }

    #[wasm_bindgen_test]
    fn test_session_cookie_is_read_on_every_resolve() {
        let doc = html_document();
        doc.set_cookie("_forge_test_sid=first; path=/").expect("set cookie");
        assert_eq!(read_cookie("_forge_test_sid").as_deref(), Some("first"));

        let cred = SessionCredential::from_cookie("_forge_test_sid");
        assert_eq!(cred.resolve(), "first");

        doc.set_cookie("_forge_test_sid=second; path=/").expect("set cookie");
        assert_eq!(cred.resolve(), "second");

        doc.set_cookie("_forge_test_sid=; path=/; max-age=0").expect("clear cookie");
    }

    fn help_fixture() -> web_sys::Element {
        let doc = web_sys::window()
            .and_then(|w| w.document())
            .expect("document");
        let container = doc.create_element("div").expect("div");
        container.set_inner_html(
            r#"<div class="markdown_syntax_toc_crumb">back</div>
               <div class="markdown_syntax_section md_ex_toc">toc</div>
               <div class="markdown_syntax_section syntax-tables">tables</div>
               <div class="markdown_syntax_section syntax-links">links</div>"#,
        );
        container
    }

    fn hidden(container: &web_sys::Element, selector: &str) -> bool {
        container
            .query_selector(selector)
            .ok()
            .flatten()
            .expect("fixture element")
            .class_list()
            .contains("hidden_in_modal")
    }

    #[wasm_bindgen_test]
    fn test_help_section_follows_fragment() {
        let container = help_fixture();

        apply_help_section(&container, "#syntax-tables");
        assert!(!hidden(&container, ".syntax-tables"));
        assert!(hidden(&container, ".syntax-links"));
        assert!(hidden(&container, ".md_ex_toc"));
        assert!(!hidden(&container, ".markdown_syntax_toc_crumb"));

        apply_help_section(&container, "#no-such-section");
        assert!(!hidden(&container, ".md_ex_toc"));
        assert!(hidden(&container, ".syntax-tables"));
        assert!(hidden(&container, ".markdown_syntax_toc_crumb"));
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}
