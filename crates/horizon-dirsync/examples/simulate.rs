//! Simulates a page that a translation tool rewrites behind its back.
//!
//! Run with `RUST_LOG=horizon_dirsync=debug cargo run --example simulate`.

use std::sync::Arc;
use std::time::Duration;

use horizon_dirsync::prelude::*;
use tracing_subscriber::EnvFilter;

fn report(page: &Page, step: &str) {
    let document = page.document();
    let root = document.root();
    tracing::info!(
        step,
        lang = document.attribute(root, "lang").unwrap_or_default(),
        dir = document.attribute(root, "dir").unwrap_or_default(),
        rtl_mode = document.has_class(root, "rtl-mode"),
        "page state"
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let page = Page::with_clock(Arc::new(ManualClock::new()));
    let document = page.document().clone();
    let root = document.root();
    document.set_attribute(root, "lang", "en")?;

    let switcher = document.create_element("select");
    document.set_attribute(switcher, "id", "language-switcher")?;
    document.append_child(document.body(), switcher)?;

    page.globals().register("translatePage", |code| {
        tracing::info!(language = code, "translating page");
        if code.is_empty() {
            return Err(HookError::new("no language declared"));
        }
        Ok(())
    });

    let controller = DirectionController::with_defaults(&page)?;
    let handle = controller.start()?;
    document.set_ready_state(ReadyState::Interactive);
    report(&page, "loaded");

    // A translation tool switches the page to Arabic.
    document.set_attribute(root, "lang", "ar")?;
    page.run_until_idle();
    report(&page, "translated to arabic");

    // The tool also clobbers the direction; the sweep repairs it.
    document.set_attribute(root, "dir", "ltr")?;
    report(&page, "direction clobbered");
    page.run_for(Duration::from_secs(1));
    report(&page, "after sweep");

    // The user picks Hebrew, then the translation banner is injected.
    document.select_value(switcher, "he-IL")?;
    page.run_until_idle();
    report(&page, "switched to hebrew");

    let banner = document.create_element("iframe");
    document.add_class(banner, "goog-te-banner-frame")?;
    document.append_child(document.body(), banner)?;
    page.run_for(Duration::from_millis(500));
    report(&page, "after widget settle");

    document.select_value(switcher, "en-GB")?;
    page.run_until_idle();
    report(&page, "switched back to english");

    handle.stop();
    Ok(())
}
