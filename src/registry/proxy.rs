/*!
 * Named list filters chained in front of `Registry::get_list`.
 *
 * `registry.filter("hide_empty").filter("hide_default").get_list(&args)`
 * applies each registered filter in order to the full list, then the
 * regular list arguments. Unknown keys are ignored.
 */

use std::sync::Arc;

use log::debug;

use crate::errors::RegistryError;
use crate::language::{Language, LanguageField};

use super::{ListArgs, Registry};

/// A named filter over the language list
pub trait LanguageProxy: Send + Sync {
    /// Name the filter is registered and chained under
    fn key(&self) -> &str;

    fn filter(
        &self,
        registry: &Registry,
        languages: Vec<Language>,
    ) -> Result<Vec<Language>, RegistryError>;
}

/// Drops the default language
#[derive(Debug, Default)]
pub struct HideDefaultProxy;

impl LanguageProxy for HideDefaultProxy {
    fn key(&self) -> &str {
        "hide_default"
    }

    fn filter(
        &self,
        _registry: &Registry,
        languages: Vec<Language>,
    ) -> Result<Vec<Language>, RegistryError> {
        Ok(languages.into_iter().filter(|l| !l.is_default).collect())
    }
}

/// Drops languages without any linked object
///
/// Counts are read live from the store, so the result does not depend on
/// stored counters being refreshed.
#[derive(Debug, Default)]
pub struct HideEmptyProxy;

impl LanguageProxy for HideEmptyProxy {
    fn key(&self) -> &str {
        "hide_empty"
    }

    fn filter(
        &self,
        registry: &Registry,
        languages: Vec<Language>,
    ) -> Result<Vec<Language>, RegistryError> {
        let mut kept = Vec::with_capacity(languages.len());
        for language in languages {
            let mut total = 0;
            for (namespace, id) in &language.node_ids {
                total += registry.store().count_links(namespace, *id)?;
            }
            if total > 0 {
                kept.push(language);
            }
        }
        Ok(kept)
    }
}

/// Ordered chain of filters bound to a registry
pub struct ProxyChain<'a> {
    registry: &'a Registry,
    proxies: Vec<Arc<dyn LanguageProxy>>,
}

impl<'a> ProxyChain<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            proxies: Vec::new(),
        }
    }

    /// Append a filter; unknown keys leave the chain unchanged
    pub fn filter(mut self, key: &str) -> Self {
        match self.registry.proxy(key) {
            Some(proxy) => self.proxies.push(proxy),
            None => debug!("Ignoring unknown language filter '{}'", key),
        }
        self
    }

    /// Keys of the filters in application order
    pub fn keys(&self) -> Vec<&str> {
        self.proxies.iter().map(|p| p.key()).collect()
    }

    pub fn get_list(&self, args: &ListArgs) -> Result<Vec<Language>, RegistryError> {
        let mut languages = self.registry.all_languages()?;
        for proxy in &self.proxies {
            languages = proxy.filter(self.registry, languages)?;
        }
        Ok(Registry::narrow(languages, args))
    }

    pub fn get_field_list(
        &self,
        args: &ListArgs,
        field: LanguageField,
    ) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .get_list(args)?
            .iter()
            .map(|l| l.field(field))
            .collect())
    }
}
