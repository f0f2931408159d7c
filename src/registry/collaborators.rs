/*!
 * External collaborators of the registry.
 *
 * The registry notifies routing after structural changes, clears per-user
 * preferences of deleted languages and checks flag codes. Each concern is a
 * trait with a no-op or bundled default.
 */

use std::path::PathBuf;

use anyhow::Result;
use log::debug;

use crate::catalog;

/// Routing/path layer, invalidated after any language add/update/delete or
/// default change
pub trait RouteInvalidator: Send + Sync {
    fn invalidate(&self);
}

/// Per-user preference store
pub trait UserPreferences: Send + Sync {
    /// Clear every user's content filter set to `slug`
    fn clear_language_filter(&self, slug: &str) -> Result<()>;
}

/// Decides whether a flag code points at an available asset
pub trait FlagResolver: Send + Sync {
    fn exists(&self, code: &str) -> bool;
}

/// Routing layer that only logs
#[derive(Debug, Default)]
pub struct NoopRouter;

impl RouteInvalidator for NoopRouter {
    fn invalidate(&self) {
        debug!("Route invalidation requested");
    }
}

/// Preference store that keeps nothing
#[derive(Debug, Default)]
pub struct NoopUserPreferences;

impl UserPreferences for NoopUserPreferences {
    fn clear_language_filter(&self, slug: &str) -> Result<()> {
        debug!("No user preferences to clear for '{}'", slug);
        Ok(())
    }
}

/// Bundled flags first, then `<code>.{png,jpg,svg}` in a custom directory
#[derive(Debug, Default, Clone)]
pub struct DefaultFlagResolver {
    custom_dir: Option<PathBuf>,
}

impl DefaultFlagResolver {
    pub fn new(custom_dir: Option<PathBuf>) -> Self {
        Self { custom_dir }
    }
}

impl FlagResolver for DefaultFlagResolver {
    fn exists(&self, code: &str) -> bool {
        if catalog::is_bundled_flag(code) {
            return true;
        }

        // Codes are file stems, never paths
        if code.is_empty() || code.contains(['/', '\\', '.']) {
            return false;
        }

        self.custom_dir.as_ref().is_some_and(|dir| {
            ["png", "jpg", "svg"]
                .iter()
                .any(|ext| dir.join(format!("{}.{}", code, ext)).is_file())
        })
    }
}
