/*!
 * End-to-end scenarios over registry and translation groups
 */

use std::collections::BTreeSet;

use polylink::language::{LanguageArgs, LanguageField};
use polylink::objects::{TranslatedObject, Translations};
use polylink::options::OptionsStore;
use polylink::registry::{ListArgs, Registry};
use polylink::store::{BackingStore, ObjectId, members};

use crate::common::Fixture;

fn map(entries: &[(&str, ObjectId)]) -> Translations {
    entries
        .iter()
        .map(|(slug, id)| (slug.to_string(), *id))
        .collect()
}

fn defaults(registry: &Registry) -> usize {
    registry
        .get_list(&ListArgs::default())
        .unwrap()
        .iter()
        .filter(|l| l.is_default)
        .count()
}

/// Every persisted group has at least two members
fn assert_groups_minimal(fixture: &Fixture, namespace: &str) {
    let slugs: BTreeSet<String> = fixture
        .registry
        .get_field_list(&ListArgs::default(), LanguageField::Slug)
        .unwrap()
        .into_iter()
        .collect();
    for group in fixture.store.nodes(namespace).unwrap() {
        let payload = fixture.registry.codec().decode(&group.payload).unwrap();
        assert!(
            members(&payload, &slugs).count() >= 2,
            "group {} has fewer than two members: {}",
            group.id,
            group.payload
        );
    }
}

/// Every listed translation carries the language it is listed under
fn assert_self_consistent(objects: &TranslatedObject, ids: &[ObjectId]) {
    for id in ids {
        for (slug, oid) in objects.get_translations(*id).unwrap() {
            assert_eq!(objects.get_language(oid).unwrap().unwrap().slug, slug);
        }
    }
}

#[test]
fn test_firstLanguage_shouldBecomeDefault() {
    let fixture = Fixture::new();

    let english = fixture
        .registry
        .add(LanguageArgs::new("en", "en_US", "English"))
        .unwrap();

    assert!(english.is_default);
    assert_eq!(fixture.registry.default_language().unwrap().unwrap().id, english.id);
    assert_eq!(fixture.options.load().unwrap().default_lang, "en");

    let french = fixture
        .registry
        .add(LanguageArgs::new("fr", "fr_FR", "Français"))
        .unwrap();
    assert!(!french.is_default);
    assert_eq!(defaults(&fixture.registry), 1);
}

#[test]
fn test_groupShrinkingToOne_shouldBeDeleted() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let a = fixture.new_object(&posts, Some("en"));
    let b = fixture.new_object(&posts, Some("fr"));

    posts.save_translations(a, &map(&[("en", a), ("fr", b)])).unwrap();
    assert_eq!(posts.get_translations(b).unwrap(), map(&[("en", a), ("fr", b)]));

    posts.save_translations(a, &map(&[("en", a)])).unwrap();

    assert_eq!(posts.get_translations(a).unwrap(), map(&[("en", a)]));
    assert_eq!(posts.get_translations(b).unwrap(), map(&[("fr", b)]));
    assert!(fixture.store.nodes("post_translations").unwrap().is_empty());
}

#[test]
fn test_deleteDefault_shouldPromoteSurvivorOrClear() {
    let fixture = Fixture::new();
    let english = fixture.add("en", "en_US", "English");
    let french = fixture.add("fr", "fr_FR", "Français");

    fixture.registry.delete(english.id).unwrap();
    let survivor = fixture.registry.get(french.id).unwrap().unwrap();
    assert!(survivor.is_default);
    assert_eq!(defaults(&fixture.registry), 1);

    fixture.registry.delete(french.id).unwrap();
    assert!(fixture.registry.default_language().unwrap().is_none());
    assert!(!fixture.registry.has_languages().unwrap());
    assert_eq!(fixture.options.load().unwrap().default_language(), None);
}

#[test]
fn test_objectsWithNoLang_shouldIgnoreLargerLimit() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    for slug in ["en", "fr", "de", "en", "fr", "de", "en", "fr", "de", "en"] {
        fixture.new_object(&posts, Some(slug));
    }
    let untagged: Vec<ObjectId> = (0..3).map(|_| fixture.new_object(&posts, None)).collect();

    let found = posts.translatable().get_objects_with_no_lang(5).unwrap();
    assert_eq!(found, untagged);
}

#[test]
fn test_addedLanguage_shouldRoundTripUserFields() {
    let fixture = Fixture::new();
    let args = LanguageArgs::new("pt", "pt_BR", "Português")
        .with_order(7)
        .with_flag("br");

    let added = fixture.registry.add(args.clone()).unwrap();
    let loaded = fixture.next_request().get(added.id).unwrap().unwrap();

    assert_eq!(LanguageArgs::from_language(&loaded), args);
    assert_eq!(loaded.w3c(), "pt-BR");
}

#[test]
fn test_slugLocalePairs_shouldStayUnique() {
    let fixture = Fixture::with_languages();

    assert!(
        fixture
            .registry
            .add(LanguageArgs::new("fr", "fr_FR", "Français"))
            .is_err()
    );
    // Same slug, other locale: the locale becomes the slug
    let canadian = fixture
        .registry
        .add(LanguageArgs::new("fr", "fr_CA", "Français canadien"))
        .unwrap();
    assert_eq!(canadian.slug, "fr_ca");

    let list = fixture.registry.get_list(&ListArgs::default()).unwrap();
    let pairs: BTreeSet<(String, String)> = list
        .iter()
        .map(|l| (l.slug.clone(), l.locale.clone()))
        .collect();
    let slugs: BTreeSet<&str> = list.iter().map(|l| l.slug.as_str()).collect();
    assert_eq!(pairs.len(), list.len());
    assert_eq!(slugs.len(), list.len());
}

#[test]
fn test_mutationSequence_shouldKeepSingleDefault() {
    let fixture = Fixture::with_languages();
    assert_eq!(defaults(&fixture.registry), 1);

    fixture.registry.update_default("de").unwrap();
    assert_eq!(defaults(&fixture.registry), 1);

    let de = fixture.registry.get("de").unwrap().unwrap();
    let mut args = LanguageArgs::from_language(&de);
    args.slug = "deu".to_string();
    fixture.registry.update(de.id, args).unwrap();
    assert_eq!(defaults(&fixture.registry), 1);
    assert_eq!(fixture.registry.default_language().unwrap().unwrap().slug, "deu");

    fixture.add("it", "it_IT", "Italiano");
    fixture.registry.delete(de.id).unwrap();
    assert_eq!(defaults(&fixture.registry), 1);
    assert_eq!(defaults(&fixture.next_request()), 1);
}

#[test]
fn test_groupMutations_shouldKeepGroupsMinimalAndConsistent() {
    let fixture = Fixture::with_languages();
    let it = fixture.add("it", "it_IT", "Italiano");
    let posts = fixture.posts();
    let ids: Vec<ObjectId> = ["en", "fr", "de", "it", "en", "fr", "de", "it"]
        .iter()
        .map(|slug| fixture.new_object(&posts, Some(*slug)))
        .collect();

    posts
        .save_translations(ids[0], &map(&[("fr", ids[1]), ("de", ids[2]), ("it", ids[3])]))
        .unwrap();
    posts
        .save_translations(ids[4], &map(&[("fr", ids[5])]))
        .unwrap();
    posts
        .save_translations(ids[4], &map(&[("fr", ids[5]), ("de", ids[2])]))
        .unwrap();
    assert_groups_minimal(&fixture, "post_translations");
    assert_self_consistent(&posts, &ids);

    posts.set_language(ids[1], Some("de".into())).unwrap();
    posts.delete_translation(ids[3]).unwrap();
    assert_groups_minimal(&fixture, "post_translations");
    assert_self_consistent(&posts, &ids);

    fixture.registry.delete(it.id).unwrap();
    posts.translatable().invalidate().unwrap();
    assert_groups_minimal(&fixture, "post_translations");
    assert_self_consistent(&posts, &ids);

    let report = posts
        .set_translation_in_mass(&[map(&[("en", ids[0]), ("fr", ids[7])])])
        .unwrap();
    assert!(report.skipped.len() <= 1);
    assert_groups_minimal(&fixture, "post_translations");
    assert_self_consistent(&posts, &ids);
}

#[test]
fn test_savingValidatedMap_shouldBeNoop() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let a = fixture.new_object(&posts, Some("en"));
    let b = fixture.new_object(&posts, Some("fr"));

    let saved = posts.save_translations(a, &map(&[("fr", b)])).unwrap();
    let nodes = fixture.store.nodes("post_translations").unwrap();

    let again = posts.save_translations(a, &saved).unwrap();
    assert_eq!(again, saved);
    assert_eq!(fixture.store.nodes("post_translations").unwrap(), nodes);
}

#[test]
fn test_languageDeletion_shouldCascadeToTermGroups() {
    let fixture = Fixture::with_languages();
    let terms = fixture.terms();
    let en = fixture.new_object(&terms, Some("en"));
    let fr = fixture.new_object(&terms, Some("fr"));
    terms.save_translations(en, &map(&[("fr", fr)])).unwrap();

    let french = fixture.registry.get("fr").unwrap().unwrap();
    fixture.registry.delete(french.id).unwrap();

    let terms = fixture.terms();
    assert!(terms.get_language(fr).unwrap().is_none());
    assert_eq!(terms.get_translations(en).unwrap(), map(&[("en", en)]));
    assert!(fixture.store.nodes("term_translations").unwrap().is_empty());
}
