/*!
 * Agreement between the cached language list and the backing store
 */

use polylink::language::LanguageArgs;
use polylink::registry::{CacheStatus, ListArgs, Registry};
use polylink::store::BackingStore;

use crate::common::Fixture;

/// (id, slug, name, order) as listed by the registry
fn listed(registry: &Registry) -> Vec<(u64, String, String, i64)> {
    registry
        .get_list(&ListArgs::default())
        .unwrap()
        .into_iter()
        .map(|l| (l.id, l.slug, l.name, l.order))
        .collect()
}

/// The same tuples read straight from the store
fn stored(fixture: &Fixture) -> Vec<(u64, String, String, i64)> {
    let mut nodes = fixture.store.nodes("language").unwrap();
    nodes.sort_by_key(|n| (n.order, n.id));
    nodes
        .into_iter()
        .map(|n| (n.id, n.slug, n.name, n.order))
        .collect()
}

#[test]
fn test_list_afterEachMutation_shouldMatchStore() {
    let fixture = Fixture::with_languages();
    let registry = &fixture.registry;
    assert_eq!(listed(registry), stored(&fixture));

    let it = fixture.add("it", "it_IT", "Italiano");
    assert_eq!(listed(registry), stored(&fixture));

    let mut args = LanguageArgs::from_language(&it).with_order(-1);
    args.name = "Italian".to_string();
    registry.update(it.id, args).unwrap();
    assert_eq!(listed(registry), stored(&fixture));
    assert_eq!(listed(registry)[0].1, "it");

    registry.delete(it.id).unwrap();
    assert_eq!(listed(registry), stored(&fixture));

    registry.update_default("fr").unwrap();
    assert_eq!(listed(registry), stored(&fixture));
    assert_eq!(registry.default_language().unwrap().unwrap().slug, "fr");
}

#[test]
fn test_list_afterMutationElsewhere_shouldMatchStoreNextRequest() {
    let fixture = Fixture::with_languages();
    let writer = fixture.next_request();

    let pl = writer.add(LanguageArgs::new("pl", "pl_PL", "Polski")).unwrap();
    let mut args = LanguageArgs::from_language(&pl);
    args.name = "Polish".to_string();
    writer.update(pl.id, args).unwrap();

    let reader = fixture.next_request();
    assert_eq!(listed(&reader), stored(&fixture));
    assert_eq!(reader.get("pl").unwrap().unwrap().name, "Polish");
}

#[test]
fn test_warmList_withLanguageAddedOrDeletedElsewhere_shouldRebuild() {
    let fixture = Fixture::with_languages();
    let reader = fixture.next_request();
    assert_eq!(listed(&reader).len(), 3);
    assert_eq!(reader.cache_status(), CacheStatus::Warm);

    let writer = fixture.next_request();
    let es = writer.add(LanguageArgs::new("es", "es_ES", "Español")).unwrap();
    assert_eq!(listed(&reader), stored(&fixture));

    writer.delete(es.id).unwrap();
    assert_eq!(listed(&reader), stored(&fixture));
    assert!(reader.get("es").unwrap().is_none());
}

#[test]
fn test_persistentTier_shouldBeDroppedOnMutation() {
    let fixture = Fixture::with_languages();
    fixture.registry.get_list(&ListArgs::default()).unwrap();

    // Stale persistent entry would otherwise survive a rename
    let de = fixture.registry.get("de").unwrap().unwrap();
    let mut args = LanguageArgs::from_language(&de);
    args.slug = "ger".to_string();
    fixture.registry.update(de.id, args).unwrap();

    let reader = fixture.next_request();
    assert!(reader.get("de").unwrap().is_none());
    assert_eq!(reader.get("ger").unwrap().unwrap().id, de.id);
    assert_eq!(listed(&reader), stored(&fixture));
}

#[test]
fn test_cleanCache_shouldForceRebuild() {
    let fixture = Fixture::with_languages();
    fixture.registry.get_list(&ListArgs::default()).unwrap();
    assert_eq!(fixture.registry.cache_status(), CacheStatus::Warm);

    fixture.registry.clean_cache().unwrap();
    assert_ne!(fixture.registry.cache_status(), CacheStatus::Warm);
    assert_eq!(listed(&fixture.registry), stored(&fixture));
    assert_eq!(fixture.registry.cache_status(), CacheStatus::Warm);
}
