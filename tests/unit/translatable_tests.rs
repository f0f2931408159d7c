/*!
 * Tests for language attachment of content objects
 */

use polylink::errors::{RegistryError, TranslationError};
use polylink::objects::{ObjectType, TranslatableObject};
use polylink::registry::ListArgs;
use polylink::store::BackingStore;

use crate::common::Fixture;

fn language_node(fixture: &Fixture, slug: &str) -> u64 {
    fixture
        .registry
        .get(slug)
        .unwrap()
        .unwrap()
        .node_id("language")
        .unwrap()
}

#[test]
fn test_getLanguage_afterPrime_shouldNotHitStore() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let ids: Vec<u64> = ["en", "fr", "de", "fr"]
        .iter()
        .map(|slug| fixture.new_object(&posts, Some(*slug)))
        .collect();
    let untagged = fixture.new_object(&posts, None);

    let reader = TranslatableObject::new(fixture.next_request(), ObjectType::post());
    let mut all = ids.clone();
    all.push(untagged);
    reader.prime(&all).unwrap();

    let before = fixture.store.round_trips();
    let slugs: Vec<Option<String>> = all
        .iter()
        .map(|id| reader.get_language(*id).unwrap().map(|l| l.slug))
        .collect();
    assert_eq!(fixture.store.round_trips(), before);
    assert_eq!(
        slugs,
        vec![
            Some("en".to_string()),
            Some("fr".to_string()),
            Some("de".to_string()),
            Some("fr".to_string()),
            None
        ]
    );

    let (hits, _, _) = reader.cache_stats();
    assert_eq!(hits, all.len() as u64);
}

#[test]
fn test_getLanguage_withoutPrime_shouldLoadOnDemand() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("de"));

    let reader = TranslatableObject::new(fixture.next_request(), ObjectType::post());
    assert_eq!(reader.get_language(id).unwrap().unwrap().slug, "de");
    assert!(reader.get_language(9999).unwrap().is_none());
}

#[test]
fn test_setLanguage_shouldReplaceAndRefreshCounts() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("en"));
    let objects = posts.translatable();

    assert_eq!(fixture.registry.get("en").unwrap().unwrap().count("language"), 1);

    objects.set_language(id, Some("fr".into())).unwrap();
    assert_eq!(objects.get_language(id).unwrap().unwrap().slug, "fr");
    assert_eq!(fixture.registry.get("en").unwrap().unwrap().count("language"), 0);
    assert_eq!(fixture.registry.get("fr").unwrap().unwrap().count("language"), 1);

    // Exactly one language link per object
    let links = fixture.store.object_links(&[id], &["language"]).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].node.id, language_node(&fixture, "fr"));
}

#[test]
fn test_setLanguage_withSameLanguage_shouldBeNoop() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("en"));
    let objects = posts.translatable();

    let group = ObjectType::post().cache_group();
    let token = fixture.registry.cache().last_changed(&group).unwrap();
    objects.set_language(id, Some("en".into())).unwrap();
    assert_eq!(fixture.registry.cache().last_changed(&group).unwrap(), token);
}

#[test]
fn test_setLanguage_withUnknownLanguage_shouldFail() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("en"));

    let result = posts.translatable().set_language(id, Some("xx".into()));
    assert!(matches!(
        result,
        Err(TranslationError::Registry(RegistryError::UnknownLanguage(_)))
    ));
    assert_eq!(posts.get_language(id).unwrap().unwrap().slug, "en");
}

#[test]
fn test_deleteLanguage_shouldDetach() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("de"));

    posts.translatable().delete_language(id).unwrap();
    assert!(posts.get_language(id).unwrap().is_none());
    assert_eq!(fixture.registry.get("de").unwrap().unwrap().count("language"), 0);
}

#[test]
fn test_termKind_shouldUseSecondaryNamespace() {
    let fixture = Fixture::with_languages();
    let terms = fixture.terms();
    let id = fixture.new_object(&terms, Some("fr"));

    let fr = fixture.registry.get("fr").unwrap().unwrap();
    let term_node = fr.node_id("term_language").unwrap();
    assert_ne!(term_node, fr.id);

    let links = fixture.store.object_links(&[id], &["term_language"]).unwrap();
    assert_eq!(links[0].node.id, term_node);
    assert_eq!(terms.get_language(id).unwrap().unwrap().slug, "fr");
    assert_eq!(fr.count("term_language"), 1);
}

#[test]
fn test_whereClause_shouldResolveCodesToNodes() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let objects = posts.translatable();

    let fr = language_node(&fixture, "fr");
    let de = language_node(&fixture, "de");
    assert_eq!(
        objects.where_clause(&["fr", "de_DE"]).unwrap(),
        format!(" AND pll_tr.node_id IN ({},{})", fr, de)
    );
    assert_eq!(
        objects.where_clause(&["fr"]).unwrap(),
        format!(" AND pll_tr.node_id IN ({})", fr)
    );
}

#[test]
fn test_whereClause_withOnlyUnknownCodes_shouldMatchNothing() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    assert_eq!(
        posts.translatable().where_clause(&["xx"]).unwrap(),
        " AND 1 = 0"
    );
}

#[test]
fn test_joinClause_shouldUseLanguageNamespace() {
    let fixture = Fixture::with_languages();
    let terms = fixture.terms();
    let join = terms.translatable().join_clause("t");

    assert!(join.contains("pll_tr.object_id = t.id"));
    assert!(join.contains("pll_tr.namespace = 'term_language'"));
}

#[test]
fn test_getObjectsWithNoLang_shouldListUntaggedObjects() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    fixture.new_object(&posts, Some("en"));
    let a = fixture.new_object(&posts, None);
    let b = fixture.new_object(&posts, None);
    fixture.new_object(&fixture.terms(), None);

    let objects = posts.translatable();
    assert_eq!(objects.get_objects_with_no_lang(0).unwrap(), vec![a, b]);
    assert_eq!(objects.get_objects_with_no_lang(1).unwrap(), vec![a]);

    objects.set_language(a, Some("fr".into())).unwrap();
    assert_eq!(objects.get_objects_with_no_lang(0).unwrap(), vec![b]);
}

#[test]
fn test_getObjectsWithNoLang_shouldServeRepeatsFromCache() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    fixture.new_object(&posts, None);
    let objects = posts.translatable();

    let start = fixture.store.round_trips();
    objects.get_objects_with_no_lang(0).unwrap();
    let first = fixture.store.round_trips() - start;

    let start = fixture.store.round_trips();
    objects.get_objects_with_no_lang(0).unwrap();
    let second = fixture.store.round_trips() - start;
    assert!(second < first);

    // Another request reads the persistent tier
    let reader = TranslatableObject::new(fixture.next_request(), ObjectType::post());
    let entries = fixture.persistent.len();
    assert_eq!(reader.get_objects_with_no_lang(0).unwrap().len(), 1);
    assert_eq!(fixture.persistent.len(), entries);
}

#[test]
fn test_setLanguageInMass_shouldTagAllObjects() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let ids: Vec<u64> = (0..3).map(|_| fixture.new_object(&posts, None)).collect();
    let objects = posts.translatable();

    objects.set_language_in_mass(&ids, "de").unwrap();

    for id in &ids {
        assert_eq!(objects.get_language(*id).unwrap().unwrap().slug, "de");
    }
    assert_eq!(fixture.registry.get("de").unwrap().unwrap().count("language"), 3);
    assert!(objects.get_objects_with_no_lang(0).unwrap().is_empty());
}

#[test]
fn test_setLanguageInMass_withUnknownLanguage_shouldFail() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, None);

    assert!(posts.translatable().set_language_in_mass(&[id], "xx").is_err());
    assert!(posts.get_language(id).unwrap().is_none());
    assert!(posts.translatable().set_language_in_mass(&[], "xx").is_ok());
}

#[test]
fn test_writes_shouldRetireOtherRequestsReads() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("en"));

    let reader = TranslatableObject::new(fixture.next_request(), ObjectType::post());
    assert_eq!(reader.get_language(id).unwrap().unwrap().slug, "en");

    posts.translatable().set_language(id, Some("fr".into())).unwrap();
    assert_eq!(reader.get_language(id).unwrap().unwrap().slug, "fr");
}

#[test]
fn test_setLanguageInMass_shouldRefreshCountsOfLeftLanguages() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let a = fixture.new_object(&posts, Some("fr"));
    let b = fixture.new_object(&posts, Some("fr"));
    let objects = posts.translatable();

    objects.set_language_in_mass(&[a, b], "de").unwrap();

    let fr = fixture.registry.get("fr").unwrap().unwrap();
    assert_eq!(fr.count("language"), 0);
    assert_eq!(
        fixture.store.count_links("language", language_node(&fixture, "fr")).unwrap(),
        0
    );
    assert_eq!(fixture.registry.get("de").unwrap().unwrap().count("language"), 2);

    let listed: Vec<String> = fixture
        .registry
        .get_list(&ListArgs::default().hide_empty())
        .unwrap()
        .into_iter()
        .map(|l| l.slug)
        .collect();
    assert_eq!(listed, vec!["de"]);
}

#[test]
fn test_getObjectsWithNoLang_afterManyWrites_shouldNotGrowPersistentTier() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let objects = posts.translatable();
    fixture.new_object(&posts, None);
    objects.get_objects_with_no_lang(5).unwrap();
    let entries = fixture.persistent.len();

    for round in 0..20 {
        fixture.new_object(&posts, None);
        assert_eq!(
            objects.get_objects_with_no_lang(5).unwrap().len(),
            (round + 2).min(5)
        );
    }
    assert_eq!(fixture.persistent.len(), entries);

    // The overwritten entry still serves other requests
    let reader = TranslatableObject::new(fixture.next_request(), ObjectType::post());
    assert_eq!(reader.get_objects_with_no_lang(5).unwrap().len(), 5);
    assert_eq!(fixture.persistent.len(), entries);
}
