/*!
 * Translation groups.
 *
 * A group is a node in the kind's translations namespace whose payload maps
 * language slugs to member object ids; every member is linked to that node.
 * Group and member links are written separately without a transaction, so
 * reads validate every member against its own language and drop entries
 * that disagree.
 */

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::TranslationError;
use crate::language::{Language, LanguageField, LanguageKey};
use crate::registry::{ListArgs, Registry};
use crate::store::{GroupPayload, NewNode, Node, NodeId, ObjectId, PayloadValue, members};

use super::ObjectType;
use super::translatable::TranslatableObject;

/// Language slug -> object id
pub type Translations = BTreeMap<String, ObjectId>;

type Result<T> = std::result::Result<T, TranslationError>;

/// Edit rights of the current user
pub trait Permissions: Send + Sync {
    fn can_edit(&self, object_type: &ObjectType, id: ObjectId) -> bool;
}

/// Grants everything
#[derive(Debug, Default)]
pub struct AllowAllPermissions;

impl Permissions for AllowAllPermissions {
    fn can_edit(&self, _object_type: &ObjectType, _id: ObjectId) -> bool {
        true
    }
}

/// Pre-check of `current_user_can_synchronize`
///
/// `Some` decides, `None` falls through to the edit-rights check.
pub trait SyncCheck: Send + Sync {
    fn pre_check(&self, object_type: &ObjectType, id: ObjectId) -> Option<bool>;
}

/// Outcome of a mass operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MassReport {
    /// Items written
    pub applied: usize,
    /// Items left out, one message each
    pub skipped: Vec<String>,
}

impl MassReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Translation group operations over objects of one kind
pub struct TranslatedObject {
    translatable: TranslatableObject,
    permissions: Arc<dyn Permissions>,
    sync_check: Option<Arc<dyn SyncCheck>>,
}

impl TranslatedObject {
    pub fn new(registry: Arc<Registry>, object_type: ObjectType) -> Self {
        Self {
            translatable: TranslatableObject::new(registry, object_type),
            permissions: Arc::new(AllowAllPermissions),
            sync_check: None,
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_sync_check(mut self, check: Arc<dyn SyncCheck>) -> Self {
        self.sync_check = Some(check);
        self
    }

    /// Language attachment operations of the same kind
    pub fn translatable(&self) -> &TranslatableObject {
        &self.translatable
    }

    pub fn object_type(&self) -> &ObjectType {
        self.translatable.object_type()
    }

    pub fn prime(&self, ids: &[ObjectId]) -> Result<()> {
        self.translatable.prime(ids)
    }

    pub fn get_language(&self, id: ObjectId) -> Result<Option<Language>> {
        self.translatable.get_language(id)
    }

    /// Detach the language, leaving the group payload as is
    pub fn delete_language(&self, id: ObjectId) -> Result<()> {
        self.translatable.delete_language(id)
    }

    fn registry(&self) -> &Arc<Registry> {
        self.translatable.registry()
    }

    fn namespace(&self) -> &str {
        &self.object_type().translations_namespace
    }

    fn slugs(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .registry()
            .get_field_list(&ListArgs::default(), LanguageField::Slug)?
            .into_iter()
            .collect())
    }

    fn decode(&self, group: &Node) -> GroupPayload {
        match self.registry().codec().decode(&group.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Treating translation group {} as empty: {:#}", group.id, e);
                GroupPayload::new()
            }
        }
    }

    /// Persist a rewritten payload, or delete the group below two members
    fn flush_group(&self, group: &Node, payload: &GroupPayload, slugs: &BTreeSet<String>) -> Result<()> {
        let size = members(payload, slugs).count();
        if size < 2 {
            debug!("Deleting translation group {} with {} member(s)", group.id, size);
            self.registry().store().delete_node(self.namespace(), group.id)?;
        } else {
            let mut node = NewNode::from(group);
            node.payload = self.registry().codec().encode(payload)?;
            self.registry()
                .store()
                .update_node(self.namespace(), group.id, &node)?;
        }
        Ok(())
    }

    /// Keep entries naming an existing language whose object carries that
    /// language
    fn validate(&self, translations: &Translations, slugs: &BTreeSet<String>) -> Result<Translations> {
        let ids: Vec<ObjectId> = translations.values().copied().collect();
        self.translatable.prime(&ids)?;

        let mut valid = Translations::new();
        for (slug, id) in translations {
            if *id == 0 || !slugs.contains(slug) {
                continue;
            }
            let language = self.translatable.get_language(*id)?;
            if language.is_some_and(|l| &l.slug == slug) {
                valid.insert(slug.clone(), *id);
            } else {
                debug!("Dropping translation {} -> {} (language mismatch)", slug, id);
            }
        }
        Ok(valid)
    }

    /// Validated translations of an object, the object itself included
    pub fn get_translations(&self, id: ObjectId) -> Result<Translations> {
        let terms = self.translatable.terms(id)?;
        let Some(language) = terms.language else {
            return Ok(Translations::new());
        };

        let slugs = self.slugs()?;
        let mut translations = Translations::new();
        if let Some(group) = &terms.group {
            let payload = self.decode(group);
            translations.extend(members(&payload, &slugs).map(|(s, oid)| (s.to_string(), oid)));
        }
        translations.insert(language.slug, id);

        self.validate(&translations, &slugs)
    }

    /// Translation of `id` in `language`
    ///
    /// `id` itself when it already carries that language, `None` when there
    /// is no translation.
    pub fn get(&self, id: ObjectId, language: impl Into<LanguageKey>) -> Result<Option<ObjectId>> {
        let Some(language) = self.registry().get(language)? else {
            return Ok(None);
        };
        if self
            .get_language(id)?
            .is_some_and(|own| own.id == language.id)
        {
            return Ok(Some(id));
        }
        Ok(self.get_translations(id)?.get(&language.slug).copied())
    }

    /// Replace the translation group of `id` with `translations`
    ///
    /// Returns the validated map that was saved.
    pub fn save_translations(&self, id: ObjectId, translations: &Translations) -> Result<Translations> {
        let language = self
            .get_language(id)?
            .ok_or(TranslationError::NoLanguage(id))?;
        let slugs = self.slugs()?;

        let mut wanted = translations.clone();
        wanted.retain(|_, oid| *oid != id);
        wanted.insert(language.slug.clone(), id);
        let validated = self.validate(&wanted, &slugs)?;

        let prior = self.get_translations(id)?;
        let own_group = self.translatable.terms(id)?.group;
        let store = self.registry().store().clone();

        // Groups whose payload changed, flushed at the end
        let mut touched: BTreeMap<NodeId, (Node, GroupPayload)> = BTreeMap::new();

        let detached: Vec<ObjectId> = prior
            .iter()
            .filter(|(slug, oid)| validated.get(*slug) != Some(*oid))
            .map(|(_, oid)| *oid)
            .collect();
        if !detached.is_empty() {
            if let Some(group) = &own_group {
                let mut payload = self.decode(group);
                payload.retain(|_, v| v.as_id().is_none_or(|oid| !detached.contains(&oid)));
                touched.insert(group.id, (group.clone(), payload));
            }
            store.unlink_objects(self.namespace(), &detached)?;
            debug!("Detached {:?} from the group of {}", detached, id);
        }

        let adds = validated.iter().any(|(slug, oid)| prior.get(slug) != Some(oid));
        if !adds || validated.len() < 2 {
            for (group, payload) in touched.values() {
                self.flush_group(group, payload, &slugs)?;
            }
            self.translatable.invalidate()?;
            return Ok(validated);
        }

        // Existing group of the object first, then of any other member
        let mut target = own_group.clone();
        if target.is_none() {
            for oid in validated.values() {
                if let Some(group) = self.translatable.terms(*oid)?.group {
                    target = Some(group);
                    break;
                }
            }
        }

        let mut payload = match &target {
            Some(group) => touched
                .remove(&group.id)
                .map(|(_, p)| p)
                .unwrap_or_else(|| self.decode(group)),
            None => GroupPayload::new(),
        };
        // Prior members sit in the object's own group only
        if own_group.is_some() {
            for slug in prior.keys() {
                payload.remove(slug);
            }
        }

        let mut displaced = Vec::new();
        for (slug, oid) in &validated {
            if let Some(occupant) = payload.get(slug).and_then(PayloadValue::as_id) {
                if occupant != *oid {
                    displaced.push(occupant);
                }
            }
            payload.insert(slug.clone(), PayloadValue::Id(*oid));
        }

        // Members moving in from other groups leave those groups
        for oid in validated.values() {
            let Some(group) = self.translatable.terms(*oid)?.group else {
                continue;
            };
            if target.as_ref().is_some_and(|t| t.id == group.id) {
                continue;
            }
            let entry = touched
                .entry(group.id)
                .or_insert_with(|| (group.clone(), self.decode(&group)));
            entry.1.retain(|_, v| v.as_id() != Some(*oid));
        }

        if !displaced.is_empty() {
            warn!("Translations {:?} displaced from the group of {}", displaced, id);
            store.unlink_objects(self.namespace(), &displaced)?;
        }

        let encoded = self.registry().codec().encode(&payload)?;
        let group_id = match &target {
            Some(group) => {
                let mut node = NewNode::from(group);
                node.payload = encoded;
                store.update_node(self.namespace(), group.id, &node)?;
                group.id
            }
            None => {
                let name = new_group_name();
                let group_id = store.insert_node(
                    self.namespace(),
                    &NewNode::new(name.clone(), name).with_payload(encoded),
                )?;
                info!(
                    "Created {} translation group {} with {} members",
                    self.object_type().kind,
                    group_id,
                    validated.len()
                );
                group_id
            }
        };

        let links: Vec<(ObjectId, NodeId)> = validated.values().map(|oid| (*oid, group_id)).collect();
        store.link_objects(self.namespace(), &links)?;

        for (group, payload) in touched.values() {
            self.flush_group(group, payload, &slugs)?;
        }

        self.translatable.invalidate()?;
        Ok(validated)
    }

    /// Remove one object from its group, matched by id
    pub fn delete_translation(&self, id: ObjectId) -> Result<()> {
        let Some(group) = self.translatable.terms(id)?.group else {
            return Ok(());
        };
        let slugs = self.slugs()?;

        let mut payload = self.decode(&group);
        payload.retain(|_, v| v.as_id() != Some(id));
        self.registry()
            .store()
            .unlink_objects(self.namespace(), &[id])?;
        self.flush_group(&group, &payload, &slugs)?;

        debug!("Removed {} {} from translation group {}", self.object_type().kind, id, group.id);
        self.translatable.invalidate()
    }

    /// Change the language of an object and keep its group consistent
    ///
    /// The object keeps its group under the new language when that slot is
    /// free, otherwise it leaves the group.
    pub fn set_language(&self, id: ObjectId, language: Option<LanguageKey>) -> Result<()> {
        let old = self.get_language(id)?;
        let group = self.translatable.terms(id)?.group;

        self.translatable.set_language(id, language)?;
        let new = self.get_language(id)?;
        if old.as_ref().map(|l| l.id) == new.as_ref().map(|l| l.id) {
            return Ok(());
        }
        let Some(group) = group else {
            return Ok(());
        };

        let slugs = self.slugs()?;
        let mut payload = self.decode(&group);
        payload.retain(|_, v| v.as_id() != Some(id));

        let moved = match &new {
            Some(language) if !members(&payload, &slugs).any(|(slug, _)| slug == language.slug) => {
                payload.insert(language.slug.clone(), PayloadValue::Id(id));
                true
            }
            _ => false,
        };
        if !moved {
            self.registry()
                .store()
                .unlink_objects(self.namespace(), &[id])?;
        }
        self.flush_group(&group, &payload, &slugs)?;

        self.translatable.invalidate()
    }

    /// Create many groups with one node batch and one link batch
    ///
    /// Maps with fewer than two valid members, or touching an object that is
    /// already translated, are skipped and reported.
    pub fn set_translation_in_mass(&self, groups: &[Translations]) -> Result<MassReport> {
        let mut report = MassReport::default();
        if groups.is_empty() {
            return Ok(report);
        }

        let slugs = self.slugs()?;
        let all: Vec<ObjectId> = groups.iter().flat_map(|t| t.values().copied()).collect();
        self.translatable.prime(&all)?;

        let mut claimed: HashSet<ObjectId> = HashSet::new();
        let mut pending: Vec<Translations> = Vec::new();
        for translations in groups {
            let validated = self.validate(translations, &slugs)?;
            if validated.len() < translations.len() {
                warn!(
                    "Dropped {} invalid member(s) from {:?}",
                    translations.len() - validated.len(),
                    translations
                );
            }
            if validated.len() < 2 {
                report
                    .skipped
                    .push(format!("{:?}: fewer than two valid members", translations));
                continue;
            }

            let mut busy = None;
            for oid in validated.values() {
                if claimed.contains(oid) || self.translatable.terms(*oid)?.group.is_some() {
                    busy = Some(*oid);
                    break;
                }
            }
            if let Some(oid) = busy {
                report
                    .skipped
                    .push(format!("{:?}: object {} is already translated", translations, oid));
                continue;
            }

            claimed.extend(validated.values().copied());
            pending.push(validated);
        }

        if pending.is_empty() {
            return Ok(report);
        }

        let codec = self.registry().codec().clone();
        let mut nodes = Vec::with_capacity(pending.len());
        for translations in &pending {
            let payload: GroupPayload = translations
                .iter()
                .map(|(slug, oid)| (slug.clone(), PayloadValue::Id(*oid)))
                .collect();
            let name = new_group_name();
            nodes.push(NewNode::new(name.clone(), name).with_payload(codec.encode(&payload)?));
        }

        let store = self.registry().store().clone();
        let group_ids = match store.insert_nodes(self.namespace(), &nodes) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to create translation groups: {:#}", e);
                report
                    .skipped
                    .push(format!("{} group(s) not created: {:#}", pending.len(), e));
                return Ok(report);
            }
        };

        let links: Vec<(ObjectId, NodeId)> = pending
            .iter()
            .zip(&group_ids)
            .flat_map(|(t, group)| t.values().map(move |oid| (*oid, *group)))
            .collect();
        if let Err(e) = store.link_objects(self.namespace(), &links) {
            warn!("Failed to link translation groups: {:#}", e);
            report
                .skipped
                .push(format!("{} group(s) not linked: {:#}", pending.len(), e));
            for group in &group_ids {
                if let Err(e) = store.delete_node(self.namespace(), *group) {
                    warn!("Failed to remove unlinked group {}: {:#}", group, e);
                }
            }
            return Ok(report);
        }

        report.applied = pending.len();
        info!(
            "Created {} {} translation group(s) in mass",
            report.applied,
            self.object_type().kind
        );
        self.translatable.invalidate()?;
        Ok(report)
    }

    /// Whether the current user may synchronize `id` with its translations
    pub fn current_user_can_synchronize(&self, id: ObjectId) -> Result<bool> {
        if let Some(check) = &self.sync_check {
            if let Some(decision) = check.pre_check(self.object_type(), id) {
                return Ok(decision);
            }
        }

        let object_type = self.object_type();
        if !self.permissions.can_edit(object_type, id) {
            return Ok(false);
        }
        Ok(self
            .get_translations(id)?
            .values()
            .all(|oid| self.permissions.can_edit(object_type, *oid)))
    }
}

fn new_group_name() -> String {
    format!("tg_{}", Uuid::new_v4().simple())
}
