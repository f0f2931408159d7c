/*!
 * Language registry.
 *
 * Builds, caches and serves the ordered language list and owns language
 * CRUD. Reads go through the process-local list (`state`) which is checked
 * against the store's language ids on every read; on a miss the list comes
 * from the persistent tier or is rebuilt from the store. Every mutation
 * empties both tiers and invalidates routing.
 */

pub mod collaborators;
pub mod proxy;
pub mod state;
pub mod validation;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::CacheLayer;
use crate::errors::RegistryError;
use crate::language::{Language, LanguageArgs, LanguageField, LanguageKey, LanguageMeta};
use crate::objects::{LANGUAGE_NAMESPACE, ObjectType};
use crate::options::{Options, OptionsStore};
use crate::store::{
    BackingStore, GroupCodec, GroupPayload, JsonGroupCodec, NewNode, Node, NodeId, ObjectId,
    members,
};

pub use collaborators::{
    DefaultFlagResolver, FlagResolver, NoopRouter, NoopUserPreferences, RouteInvalidator,
    UserPreferences,
};
pub use proxy::{HideDefaultProxy, HideEmptyProxy, LanguageProxy, ProxyChain};
pub use state::CacheStatus;

use state::{LanguageIndex, ListCache, ReadDecision};

/// Persistent tier key of the language list
const LANGUAGES_CACHE_KEY: &str = "languages";

type Result<T> = std::result::Result<T, RegistryError>;

/// Narrowing options of `Registry::get_list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Drop languages without any tagged object
    pub hide_empty: bool,
    /// Drop the default language
    pub hide_default: bool,
}

impl ListArgs {
    pub fn hide_empty(mut self) -> Self {
        self.hide_empty = true;
        self
    }

    pub fn hide_default(mut self) -> Self {
        self.hide_default = true;
        self
    }

    fn keeps(&self, language: &Language) -> bool {
        !(self.hide_empty && language.total_count() == 0)
            && !(self.hide_default && language.is_default)
    }
}

/// Callback run at the end of every list rebuild
///
/// Reads of the registry from inside a hook see an empty list.
pub trait ListHook: Send + Sync {
    fn after_build(&self, registry: &Registry, languages: &mut Vec<Language>);
}

/// Persistent tier entry: the list and the ids it was built from
#[derive(Serialize, Deserialize)]
struct CachedList {
    ids: Vec<NodeId>,
    languages: Vec<Language>,
}

/// Registry of configured languages
pub struct Registry {
    store: Arc<dyn BackingStore>,
    options: Arc<dyn OptionsStore>,
    cache: CacheLayer,
    codec: Arc<dyn GroupCodec>,
    object_types: Vec<ObjectType>,
    list: ListCache,
    proxies: RwLock<HashMap<String, Arc<dyn LanguageProxy>>>,
    hooks: RwLock<Vec<Arc<dyn ListHook>>>,
    router: Arc<dyn RouteInvalidator>,
    user_preferences: Arc<dyn UserPreferences>,
    flags: Arc<dyn FlagResolver>,
}

impl Registry {
    /// Create a registry with the default object types and collaborators
    pub fn new(
        store: Arc<dyn BackingStore>,
        options: Arc<dyn OptionsStore>,
        cache: CacheLayer,
    ) -> Self {
        let registry = Self {
            store,
            options,
            cache,
            codec: Arc::new(JsonGroupCodec),
            object_types: ObjectType::defaults(),
            list: ListCache::default(),
            proxies: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Vec::new()),
            router: Arc::new(NoopRouter),
            user_preferences: Arc::new(NoopUserPreferences),
            flags: Arc::new(DefaultFlagResolver::default()),
        };
        registry.register_proxy(Arc::new(HideDefaultProxy));
        registry.register_proxy(Arc::new(HideEmptyProxy));
        registry
    }

    /// Replace the registered object types; the first language namespace
    /// must be the primary one
    pub fn with_object_types(mut self, object_types: Vec<ObjectType>) -> Self {
        self.object_types = object_types;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn GroupCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_router(mut self, router: Arc<dyn RouteInvalidator>) -> Self {
        self.router = router;
        self
    }

    pub fn with_user_preferences(mut self, preferences: Arc<dyn UserPreferences>) -> Self {
        self.user_preferences = preferences;
        self
    }

    pub fn with_flag_resolver(mut self, flags: Arc<dyn FlagResolver>) -> Self {
        self.flags = flags;
        self
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    pub fn codec(&self) -> &Arc<dyn GroupCodec> {
        &self.codec
    }

    pub fn options(&self) -> &Arc<dyn OptionsStore> {
        &self.options
    }

    pub fn object_types(&self) -> &[ObjectType] {
        &self.object_types
    }

    /// Registered object type of a kind
    pub fn object_type(&self, kind: &str) -> Option<&ObjectType> {
        self.object_types.iter().find(|t| t.kind == kind)
    }

    /// Language namespaces other than the primary one, in registration order
    pub fn secondary_namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = Vec::new();
        for object_type in &self.object_types {
            let ns = object_type.language_namespace.as_str();
            if ns != LANGUAGE_NAMESPACE && !namespaces.contains(&ns) {
                namespaces.push(ns);
            }
        }
        namespaces
    }

    /// Current state of the process-local list
    pub fn cache_status(&self) -> CacheStatus {
        self.list.status()
    }

    pub fn register_hook(&self, hook: Arc<dyn ListHook>) {
        self.hooks.write().push(hook);
    }

    /// Add or replace a named list filter
    pub fn register_proxy(&self, proxy: Arc<dyn LanguageProxy>) {
        self.proxies.write().insert(proxy.key().to_string(), proxy);
    }

    pub(crate) fn proxy(&self, key: &str) -> Option<Arc<dyn LanguageProxy>> {
        self.proxies.read().get(key).cloned()
    }

    /// Start a proxy chain with a first filter
    pub fn filter(&self, key: &str) -> ProxyChain<'_> {
        ProxyChain::new(self).filter(key)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Resolve a language by id, slug, locale or namespaced node id
    pub fn get(&self, key: impl Into<LanguageKey>) -> Result<Option<Language>> {
        let key = key.into();
        let index = self.index()?;
        Ok(index.get(&key.index_key()).cloned())
    }

    /// Ordered language list, optionally narrowed
    pub fn get_list(&self, args: &ListArgs) -> Result<Vec<Language>> {
        let index = self.index()?;
        Ok(Self::narrow(index.languages().to_vec(), args))
    }

    /// Ordered language list projected to one field
    pub fn get_field_list(&self, args: &ListArgs, field: LanguageField) -> Result<Vec<String>> {
        Ok(self
            .get_list(args)?
            .iter()
            .map(|l| l.field(field))
            .collect())
    }

    /// The default language, if any
    pub fn default_language(&self) -> Result<Option<Language>> {
        Ok(self
            .index()?
            .languages()
            .iter()
            .find(|l| l.is_default)
            .cloned())
    }

    pub fn has_languages(&self) -> Result<bool> {
        Ok(!self.index()?.languages().is_empty())
    }

    /// Unfiltered list, used by proxy chains
    pub(crate) fn all_languages(&self) -> Result<Vec<Language>> {
        Ok(self.index()?.languages().to_vec())
    }

    pub(crate) fn narrow(languages: Vec<Language>, args: &ListArgs) -> Vec<Language> {
        languages.into_iter().filter(|l| args.keeps(l)).collect()
    }

    /// Drop both cache tiers
    pub fn clean_cache(&self) -> Result<()> {
        self.list.clear();
        self.cache.delete(LANGUAGES_CACHE_KEY)?;
        debug!("Language caches cleaned");
        Ok(())
    }

    fn index(&self) -> Result<Arc<LanguageIndex>> {
        match self.list.begin_read() {
            ReadDecision::Reentrant => Ok(Arc::new(LanguageIndex::default())),
            ReadDecision::Warm(index) => {
                let ids = self.store.node_ids(LANGUAGE_NAMESPACE)?;
                if ids == index.ids() {
                    return Ok(index);
                }
                warn!(
                    "Language list changed in the store ({} cached, {} stored), rebuilding",
                    index.ids().len(),
                    ids.len()
                );
                self.list.mark_stale();
                self.rebuild(Some(ids))
            }
            ReadDecision::Rebuild => self.rebuild(None),
        }
    }

    fn rebuild(&self, ids: Option<Vec<NodeId>>) -> Result<Arc<LanguageIndex>> {
        let ticket = self.list.begin_build();
        match self.load_languages(ids) {
            Ok((ids, languages)) => {
                let index = Arc::new(LanguageIndex::new(languages).built_from(ids));
                self.list.finish_build(ticket, index.clone());
                Ok(index)
            }
            Err(e) => {
                self.list.abort_build(ticket);
                Err(e)
            }
        }
    }

    /// Load the list and the sorted primary ids it reflects
    fn load_languages(&self, ids: Option<Vec<NodeId>>) -> Result<(Vec<NodeId>, Vec<Language>)> {
        let options = self.options.load()?;
        let ids = match ids {
            Some(ids) => ids,
            None => self.store.node_ids(LANGUAGE_NAMESPACE)?,
        };

        let mut languages = None;
        if options.cache_languages {
            match self.cache.get_json::<CachedList>(LANGUAGES_CACHE_KEY)? {
                Some(cached) if cached.ids == ids => {
                    debug!("Language list served from the persistent cache");
                    languages = Some(cached.languages);
                }
                Some(_) => debug!("Persistent language list is stale"),
                None => {}
            }
        }

        let mut languages = match languages {
            Some(languages) => languages,
            None => {
                let languages = self.build_from_store()?;
                if options.cache_languages {
                    self.cache.set_json(
                        LANGUAGES_CACHE_KEY,
                        &CachedList {
                            ids: ids.clone(),
                            languages: languages.clone(),
                        },
                    )?;
                }
                languages
            }
        };

        for language in &mut languages {
            language.is_default = language.slug == options.default_lang;
        }

        let hooks: Vec<Arc<dyn ListHook>> = self.hooks.read().clone();
        for hook in hooks {
            hook.after_build(self, &mut languages);
        }

        Ok((ids, languages))
    }

    fn build_from_store(&self) -> Result<Vec<Language>> {
        debug!("Building language list from the store");
        let primary = self.store.nodes(LANGUAGE_NAMESPACE)?;

        let mut secondary: Vec<(&str, HashMap<String, Node>)> = Vec::new();
        for ns in self.secondary_namespaces() {
            let by_slug = self
                .store
                .nodes(ns)?
                .into_iter()
                .map(|n| (n.slug.clone(), n))
                .collect();
            secondary.push((ns, by_slug));
        }

        let mut languages = Vec::with_capacity(primary.len());
        for node in primary {
            let meta: LanguageMeta = match serde_json::from_str(&node.payload) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping language node {} with invalid payload: {}", node.id, e);
                    continue;
                }
            };

            let mut node_ids = BTreeMap::from([(LANGUAGE_NAMESPACE.to_string(), node.id)]);
            let mut counts = BTreeMap::from([(LANGUAGE_NAMESPACE.to_string(), node.count)]);

            for (ns, by_slug) in &secondary {
                let (id, count) = match by_slug.get(&node.slug) {
                    Some(mirror) => (mirror.id, mirror.count),
                    None => {
                        warn!("Language '{}' has no node in '{}', creating it", node.slug, ns);
                        let mirror = NewNode::new(node.slug.clone(), node.name.clone())
                            .with_order(node.order);
                        (self.store.insert_node(ns, &mirror)?, 0)
                    }
                };
                node_ids.insert(ns.to_string(), id);
                counts.insert(ns.to_string(), count);
            }

            languages.push(Language {
                id: node.id,
                is_default: false,
                slug: node.slug,
                locale: meta.locale,
                name: node.name,
                rtl: meta.rtl,
                order: node.order,
                flag_code: meta.flag_code,
                node_ids,
                counts,
            });
        }

        languages.sort_by_key(|l| (l.order, l.id));
        Ok(languages)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a language with its mirrored secondary nodes
    pub fn add(&self, args: LanguageArgs) -> Result<Language> {
        let existing = self.get_list(&ListArgs::default())?;
        let slug =
            validation::validate_language(&args, &existing, None, self.flags.as_ref())?;
        if slug != args.slug {
            info!(
                "Language code '{}' is taken, storing {} as '{}'",
                args.slug, args.locale, slug
            );
        }

        let meta = LanguageMeta {
            locale: args.locale.clone(),
            rtl: args.rtl,
            flag_code: args.flag_code.clone().filter(|c| !c.is_empty()),
        };
        let payload = serde_json::to_string(&meta).map_err(anyhow::Error::from)?;
        let id = self.store.insert_node(
            LANGUAGE_NAMESPACE,
            &NewNode::new(slug.clone(), args.name.clone())
                .with_order(args.order)
                .with_payload(payload),
        )?;

        for ns in self.secondary_namespaces() {
            self.store.insert_node(
                ns,
                &NewNode::new(slug.clone(), args.name.clone()).with_order(args.order),
            )?;
        }

        let options = self.options.load()?;
        if existing.is_empty() || options.default_language().is_none() {
            self.options.update(&mut |o: &mut Options| o.default_lang = slug.clone())?;
        }

        info!("Added language {} ({})", slug, args.locale);
        self.after_mutation()?;

        self.get(id)?
            .ok_or_else(|| RegistryError::UnknownLanguage(id.to_string()))
    }

    /// Update a language; a slug change cascades to every slug-keyed structure
    pub fn update(&self, id: NodeId, args: LanguageArgs) -> Result<Language> {
        let existing = self.get_list(&ListArgs::default())?;
        let old = existing
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownLanguage(id.to_string()))?;

        let slug =
            validation::validate_language(&args, &existing, Some(id), self.flags.as_ref())?;

        let meta = LanguageMeta {
            locale: args.locale.clone(),
            rtl: args.rtl,
            flag_code: args.flag_code.clone().filter(|c| !c.is_empty()),
        };
        let payload = serde_json::to_string(&meta).map_err(anyhow::Error::from)?;
        self.store.update_node(
            LANGUAGE_NAMESPACE,
            id,
            &NewNode::new(slug.clone(), args.name.clone())
                .with_order(args.order)
                .with_payload(payload),
        )?;

        for (ns, node_id) in old.node_ids.iter().filter(|(ns, _)| *ns != LANGUAGE_NAMESPACE) {
            self.store.update_node(
                ns,
                *node_id,
                &NewNode::new(slug.clone(), args.name.clone()).with_order(args.order),
            )?;
        }

        if old.slug != slug {
            info!("Renaming language '{}' to '{}'", old.slug, slug);
            let slugs: BTreeSet<String> = existing
                .iter()
                .map(|l| if l.id == id { slug.clone() } else { l.slug.clone() })
                .collect();
            for object_type in &self.object_types {
                self.rewrite_groups(object_type, &old, &slugs, |payload| {
                    if let Some(value) = payload.remove(&old.slug) {
                        payload.insert(slug.clone(), value);
                    }
                })?;
            }
            self.options
                .update(&mut |o: &mut Options| o.rename_language(&old.slug, &slug))?;
        }

        self.bump_object_caches()?;
        self.after_mutation()?;

        self.get(id)?
            .ok_or_else(|| RegistryError::UnknownLanguage(id.to_string()))
    }

    /// Delete a language and everything keyed by it
    pub fn delete(&self, id: NodeId) -> Result<()> {
        let languages = self.get_list(&ListArgs::default())?;
        let language = languages
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownLanguage(id.to_string()))?;

        // Default first, so no reader ever sees a default pointing nowhere
        let options = self.options.load()?;
        if options.default_lang == language.slug {
            let survivor = languages.iter().find(|l| l.id != id).map(|l| l.slug.clone());
            match &survivor {
                Some(slug) => info!("Promoting '{}' to default language", slug),
                None => info!("Deleting the last language, no default remains"),
            }
            self.options.update(&mut |o: &mut Options| match &survivor {
                Some(slug) => {
                    o.default_lang = slug.clone();
                    o.remap_theme_locations(slug);
                }
                None => o.default_lang.clear(),
            })?;
        }

        let survivors: BTreeSet<String> = languages
            .iter()
            .filter(|l| l.id != id)
            .map(|l| l.slug.clone())
            .collect();
        for object_type in &self.object_types {
            let removed = self.rewrite_groups(object_type, &language, &survivors, |payload| {
                payload.remove(&language.slug);
            })?;
            if !removed.is_empty() {
                self.store
                    .unlink_objects(&object_type.translations_namespace, &removed)?;
            }
        }

        self.user_preferences.clear_language_filter(&language.slug)?;
        self.options
            .update(&mut |o: &mut Options| o.remove_language(&language.slug))?;

        for (ns, node_id) in language.node_ids.iter().filter(|(ns, _)| *ns != LANGUAGE_NAMESPACE) {
            self.store.delete_node(ns, *node_id)?;
        }
        self.store.delete_node(LANGUAGE_NAMESPACE, id)?;

        info!("Deleted language {}", language.slug);
        self.bump_object_caches()?;
        self.after_mutation()
    }

    /// Make `slug` the default language
    pub fn update_default(&self, slug: &str) -> Result<()> {
        let options = self.options.load()?;
        if options.default_lang == slug {
            return Ok(());
        }

        if self.get(slug)?.is_none() {
            return Err(RegistryError::UnknownLanguage(slug.to_string()));
        }

        self.options.update(&mut |o: &mut Options| {
            o.default_lang = slug.to_string();
            o.remap_theme_locations(slug);
        })?;

        info!("Default language is now '{}'", slug);
        self.bump_object_caches()?;
        self.after_mutation()
    }

    fn after_mutation(&self) -> Result<()> {
        self.clean_cache()?;
        self.router.invalidate();
        Ok(())
    }

    fn bump_object_caches(&self) -> Result<()> {
        for object_type in &self.object_types {
            self.cache.bump(&object_type.cache_group())?;
        }
        Ok(())
    }

    /// Apply `edit` to every translation group holding an object of
    /// `language`, deleting groups left with fewer than two members among
    /// `slugs`
    ///
    /// Returns the objects of `language` that were group members.
    fn rewrite_groups(
        &self,
        object_type: &ObjectType,
        language: &Language,
        slugs: &BTreeSet<String>,
        mut edit: impl FnMut(&mut GroupPayload),
    ) -> Result<Vec<ObjectId>> {
        let Some(node) = language.node_id(&object_type.language_namespace) else {
            return Ok(Vec::new());
        };
        let objects = self
            .store
            .linked_objects(&object_type.language_namespace, node)?;
        if objects.is_empty() {
            return Ok(Vec::new());
        }

        let links = self
            .store
            .object_links(&objects, &[object_type.translations_namespace.as_str()])?;
        let linked: Vec<ObjectId> = links.iter().map(|l| l.object_id).collect();

        let mut groups: BTreeMap<NodeId, Node> = BTreeMap::new();
        for link in links {
            groups.entry(link.node.id).or_insert(link.node);
        }

        for (group_id, group) in groups {
            let mut payload = match self.codec.decode(&group.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Deleting translation group {} with invalid payload: {}", group_id, e);
                    self.store
                        .delete_node(&object_type.translations_namespace, group_id)?;
                    continue;
                }
            };
            edit(&mut payload);

            let remaining = members(&payload, slugs).count();

            if remaining < 2 {
                debug!("Deleting translation group {} left with {} member(s)", group_id, remaining);
                self.store
                    .delete_node(&object_type.translations_namespace, group_id)?;
            } else {
                let mut updated = NewNode::from(&group);
                updated.payload = self.codec.encode(&payload)?;
                self.store
                    .update_node(&object_type.translations_namespace, group_id, &updated)?;
            }
        }

        Ok(linked)
    }
}
