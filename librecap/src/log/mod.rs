//! Simple re-export of logging-related macros.
pub use tracing::{debug, info, trace, warn};

/// Install color_eyre as the global error handler.
#[tracing::instrument]
pub fn install_color_eyre() -> color_eyre::eyre::Result<()> {
    let mut hook = color_eyre::config::HookBuilder::default();
    let repository = env!("CARGO_PKG_REPOSITORY");
    if !repository.is_empty() {
        hook = hook.issue_url(format!("{repository}/issues/new"));
    }

    hook.add_default_filters()
        .add_frame_filter(Box::new(|frames| {
            let filters = &["tracing::", "color_eyre::", "reqwest::", "<core::"];

            frames.retain(|frame| {
                !filters.iter().any(|f| {
                    let name = if let Some(name) = frame.name.as_ref() {
                        name.as_str()
                    } else {
                        return true;
                    };

                    name.starts_with(f)
                })
            });
        }))
        .install()?;

    Ok(())
}
