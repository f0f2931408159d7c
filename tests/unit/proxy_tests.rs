/*!
 * Tests for the language list filters
 */

use std::sync::Arc;

use polylink::errors::RegistryError;
use polylink::language::{Language, LanguageArgs, LanguageField};
use polylink::registry::{LanguageProxy, ListArgs, Registry};
use polylink::store::BackingStore;

use crate::common::Fixture;

/// Keeps right-to-left languages only
struct RtlOnly;

impl LanguageProxy for RtlOnly {
    fn key(&self) -> &str {
        "rtl_only"
    }

    fn filter(&self, _registry: &Registry, languages: Vec<Language>) -> Result<Vec<Language>, RegistryError> {
        Ok(languages.into_iter().filter(|l| l.rtl).collect())
    }
}

fn slugs(languages: &[Language]) -> Vec<&str> {
    languages.iter().map(|l| l.slug.as_str()).collect()
}

#[test]
fn test_hideDefault_shouldDropDefaultLanguage() {
    let fixture = Fixture::with_languages();
    let list = fixture
        .registry
        .filter("hide_default")
        .get_list(&ListArgs::default())
        .unwrap();
    assert_eq!(slugs(&list), vec!["fr", "de"]);
}

#[test]
fn test_hideEmpty_shouldUseLiveCounts() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    let id = fixture.new_object(&posts, Some("de"));

    // Warm list, then a write the list does not know about
    fixture.registry.get_list(&ListArgs::default()).unwrap();
    let fr = fixture.registry.get("fr").unwrap().unwrap();
    fixture.store.set_link(id, "language", Some(fr.id)).unwrap();

    let list = fixture
        .registry
        .filter("hide_empty")
        .get_list(&ListArgs::default())
        .unwrap();
    assert_eq!(slugs(&list), vec!["fr"]);
}

#[test]
fn test_chain_shouldApplyFiltersInOrder() {
    let fixture = Fixture::with_languages();
    let posts = fixture.posts();
    fixture.new_object(&posts, Some("en"));
    fixture.new_object(&posts, Some("fr"));

    let chain = fixture.registry.filter("hide_empty").filter("hide_default");
    assert_eq!(chain.keys(), vec!["hide_empty", "hide_default"]);
    assert_eq!(
        chain
            .get_field_list(&ListArgs::default(), LanguageField::Slug)
            .unwrap(),
        vec!["fr"]
    );
}

#[test]
fn test_chain_withUnknownKey_shouldSkipIt() {
    let fixture = Fixture::with_languages();
    let chain = fixture.registry.filter("no_such_filter").filter("hide_default");

    assert_eq!(chain.keys(), vec!["hide_default"]);
    assert_eq!(slugs(&chain.get_list(&ListArgs::default()).unwrap()), vec!["fr", "de"]);
}

#[test]
fn test_registerProxy_shouldMakeCustomFilterAvailable() {
    let fixture = Fixture::with_languages();
    fixture.add("he", "he_IL", "עברית");
    fixture.registry.register_proxy(Arc::new(RtlOnly));

    let list = fixture
        .registry
        .filter("rtl_only")
        .get_list(&ListArgs::default())
        .unwrap();
    assert!(list.is_empty());

    let he = fixture.registry.get("he").unwrap().unwrap();
    let mut args = LanguageArgs::from_language(&he);
    args.rtl = true;
    fixture.registry.update(he.id, args).unwrap();

    let list = fixture
        .registry
        .filter("rtl_only")
        .get_list(&ListArgs::default())
        .unwrap();
    assert_eq!(slugs(&list), vec!["he"]);
}

#[test]
fn test_chain_shouldStillApplyListArgs() {
    let fixture = Fixture::with_languages();
    let list = fixture
        .registry
        .filter("no_such_filter")
        .get_list(&ListArgs::default().hide_default())
        .unwrap();
    assert_eq!(slugs(&list), vec!["fr", "de"]);
}
