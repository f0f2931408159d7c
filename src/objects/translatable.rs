/*!
 * Language attachment of content objects.
 *
 * Per-object reads go through a batched cache: `prime` loads the language
 * and translation group links of many objects in one store round trip and
 * every later lookup for those objects is served locally. Local entries
 * belong to the kind's staleness token they were loaded under and are
 * dropped as soon as any writer bumps it. Persistent entries keep a stable
 * key and carry their token, so a bump overwrites them in place.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{LocalCache, hash_key};
use crate::errors::{RegistryError, TranslationError};
use crate::language::{Language, LanguageKey};
use crate::registry::{ListArgs, Registry};
use crate::store::{Node, NodeId, ObjectId};

use super::ObjectType;
use super::query::LanguageClause;

/// Links of one object as loaded by a batch read
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectTerms {
    pub language: Option<Language>,
    pub group: Option<Node>,
}

/// Key parts of a cached "objects with no language" query
#[derive(Serialize)]
struct UntranslatedKey<'a> {
    kind: &'a str,
    languages: Vec<NodeId>,
    limit: usize,
}

/// Persistent tier entry of an "objects with no language" query
#[derive(Serialize, Deserialize)]
struct CachedIds {
    token: String,
    ids: Vec<ObjectId>,
}

/// Attaches one language to objects of a kind
pub struct TranslatableObject {
    registry: Arc<Registry>,
    object_type: ObjectType,
    terms: LocalCache<ObjectId, ObjectTerms>,
    untranslated: LocalCache<String, Vec<ObjectId>>,
    /// Token the local entries were loaded under
    loaded_under: Mutex<Option<String>>,
}

impl TranslatableObject {
    pub fn new(registry: Arc<Registry>, object_type: ObjectType) -> Self {
        Self {
            registry,
            object_type,
            terms: LocalCache::default(),
            untranslated: LocalCache::default(),
            loaded_under: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Hit/miss statistics of the per-object cache
    pub fn cache_stats(&self) -> (u64, u64, f64) {
        self.terms.stats()
    }

    /// Current staleness token of this kind; local entries loaded under
    /// another token are dropped
    fn token(&self) -> Result<String, TranslationError> {
        let token = self
            .registry
            .cache()
            .last_changed(&self.object_type.cache_group())?;
        let mut loaded_under = self.loaded_under.lock();
        if loaded_under.as_deref() != Some(token.as_str()) {
            if loaded_under.is_some() {
                debug!(
                    "{} objects changed, dropping local reads",
                    self.object_type.kind
                );
            }
            self.terms.clear();
            self.untranslated.clear();
            *loaded_under = Some(token.clone());
        }
        Ok(token)
    }

    /// Retire every batched read of this kind, here and in other processes
    ///
    /// Callers creating or deleting objects of this kind call it afterwards.
    pub fn invalidate(&self) -> Result<(), TranslationError> {
        let token = self
            .registry
            .cache()
            .bump(&self.object_type.cache_group())?;
        let mut loaded_under = self.loaded_under.lock();
        self.terms.clear();
        self.untranslated.clear();
        *loaded_under = Some(token);
        Ok(())
    }

    /// Load the links of `ids` in one round trip
    ///
    /// Every object is cached, including those without any link.
    pub fn prime(&self, ids: &[ObjectId]) -> Result<(), TranslationError> {
        let token = self.token()?;
        let missing: Vec<ObjectId> = ids
            .iter()
            .copied()
            .filter(|id| !self.terms.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let languages = self.registry.get_list(&ListArgs::default())?;
        let by_node: BTreeMap<NodeId, &Language> = languages
            .iter()
            .filter_map(|l| l.node_id(&self.object_type.language_namespace).map(|n| (n, l)))
            .collect();

        let links = self.registry.store().object_links(
            &missing,
            &[
                self.object_type.language_namespace.as_str(),
                self.object_type.translations_namespace.as_str(),
            ],
        )?;

        let mut terms: BTreeMap<ObjectId, ObjectTerms> =
            missing.iter().map(|id| (*id, ObjectTerms::default())).collect();
        for link in links {
            let entry = terms.entry(link.object_id).or_default();
            if link.node.namespace == self.object_type.language_namespace {
                entry.language = by_node.get(&link.node.id).map(|l| (*l).clone());
            } else {
                entry.group = Some(link.node);
            }
        }

        debug!(
            "Primed {} {} object(s) in one round trip",
            terms.len(),
            self.object_type.kind
        );
        // A bump during the read leaves these links unpublished
        let loaded_under = self.loaded_under.lock();
        if loaded_under.as_deref() == Some(token.as_str()) {
            self.terms.store_many(terms);
        }
        Ok(())
    }

    pub(crate) fn terms(&self, id: ObjectId) -> Result<ObjectTerms, TranslationError> {
        self.token()?;
        if let Some(terms) = self.terms.get(&id) {
            return Ok(terms);
        }
        self.prime(&[id])?;
        Ok(self.terms.get(&id).unwrap_or_default())
    }

    /// Language attached to an object
    ///
    /// Objects not yet primed are loaded one round trip each; call `prime`
    /// with every id first when reading many objects.
    pub fn get_language(&self, id: ObjectId) -> Result<Option<Language>, TranslationError> {
        Ok(self.terms(id)?.language)
    }

    /// Attach a language, replacing any previous one; `None` detaches
    pub fn set_language(
        &self,
        id: ObjectId,
        language: Option<LanguageKey>,
    ) -> Result<(), TranslationError> {
        let target = match language {
            Some(key) => {
                let index_key = key.index_key();
                Some(
                    self.registry
                        .get(key)?
                        .ok_or(RegistryError::UnknownLanguage(index_key))?,
                )
            }
            None => None,
        };

        let current = self.get_language(id)?;
        if current.as_ref().map(|l| l.id) == target.as_ref().map(|l| l.id) {
            return Ok(());
        }

        let namespace = self.object_type.language_namespace.as_str();
        let node = match &target {
            Some(language) => Some(self.language_node(language)?),
            None => None,
        };
        self.registry.store().set_link(id, namespace, node)?;

        for language in current.iter().chain(target.iter()) {
            self.registry
                .store()
                .refresh_count(namespace, self.language_node(language)?)?;
        }
        // Counts are part of the cached language list
        self.registry.clean_cache()?;

        debug!(
            "{} {} language: {:?} -> {:?}",
            self.object_type.kind,
            id,
            current.map(|l| l.slug),
            target.map(|l| l.slug)
        );
        self.invalidate()
    }

    /// Detach the language without touching translation groups
    pub fn delete_language(&self, id: ObjectId) -> Result<(), TranslationError> {
        self.set_language(id, None)
    }

    /// Query fragments narrowing this kind to some languages
    ///
    /// Codes are resolved through the registry; unknown codes are dropped.
    pub fn clause(&self, codes: &[&str]) -> Result<LanguageClause, TranslationError> {
        let mut node_ids = Vec::with_capacity(codes.len());
        for code in codes {
            if let Some(language) = self.registry.get(*code)? {
                node_ids.extend(language.node_id(&self.object_type.language_namespace));
            }
        }
        Ok(LanguageClause::new(
            self.object_type.language_namespace.clone(),
            node_ids,
        ))
    }

    /// Join fragment onto `alias.id`
    pub fn join_clause(&self, alias: &str) -> String {
        LanguageClause::new(self.object_type.language_namespace.clone(), Vec::new())
            .join_clause(alias)
    }

    /// Filter fragment for one or many languages
    pub fn where_clause(&self, codes: &[&str]) -> Result<String, TranslationError> {
        Ok(self.clause(codes)?.where_clause())
    }

    /// Objects of this kind attached to no language, at most `limit`
    /// (`0` for all)
    pub fn get_objects_with_no_lang(&self, limit: usize) -> Result<Vec<ObjectId>, TranslationError> {
        let languages = self.registry.get_list(&ListArgs::default())?;
        let node_ids: Vec<NodeId> = languages
            .iter()
            .filter_map(|l| l.node_id(&self.object_type.language_namespace))
            .collect();

        let token = self.token()?;
        let key = format!(
            "untranslated:{}",
            hash_key(&UntranslatedKey {
                kind: &self.object_type.kind,
                languages: node_ids.clone(),
                limit,
            })
        );

        if let Some(ids) = self.untranslated.get(&key) {
            return Ok(ids);
        }
        if let Some(cached) = self.registry.cache().get_json::<CachedIds>(&key)? {
            if cached.token == token {
                self.untranslated.store(key, cached.ids.clone());
                return Ok(cached.ids);
            }
            debug!("Untranslated {} list is stale", self.object_type.kind);
        }

        let ids = self.registry.store().objects_without_link(
            &self.object_type.kind,
            &self.object_type.language_namespace,
            &node_ids,
            limit,
        )?;
        self.registry.cache().set_json(
            &key,
            &CachedIds {
                token,
                ids: ids.clone(),
            },
        )?;
        self.untranslated.store(key, ids.clone());
        Ok(ids)
    }

    /// Attach one language to many objects in one round trip
    pub fn set_language_in_mass(
        &self,
        ids: &[ObjectId],
        language: impl Into<LanguageKey>,
    ) -> Result<(), TranslationError> {
        if ids.is_empty() {
            return Ok(());
        }

        let key = language.into();
        let index_key = key.index_key();
        let language = self
            .registry
            .get(key)?
            .ok_or(RegistryError::UnknownLanguage(index_key))?;
        let node = self.language_node(&language)?;
        let namespace = self.object_type.language_namespace.as_str();

        // Languages the objects leave need their counts refreshed too
        let mut touched: BTreeSet<NodeId> = self
            .registry
            .store()
            .object_links(ids, &[namespace])?
            .into_iter()
            .map(|link| link.node.id)
            .collect();
        touched.insert(node);

        let links: Vec<(ObjectId, NodeId)> = ids.iter().map(|id| (*id, node)).collect();
        self.registry.store().link_objects(namespace, &links)?;
        for touched_node in touched {
            self.registry.store().refresh_count(namespace, touched_node)?;
        }
        self.registry.clean_cache()?;

        info!(
            "Assigned {} {} object(s) to {}",
            ids.len(),
            self.object_type.kind,
            language.slug
        );
        self.invalidate()
    }

    fn language_node(&self, language: &Language) -> Result<NodeId, TranslationError> {
        language
            .node_id(&self.object_type.language_namespace)
            .ok_or_else(|| {
                RegistryError::UnknownLanguage(format!(
                    "{}:{}",
                    self.object_type.language_namespace, language.slug
                ))
                .into()
            })
    }
}
