/*!
 * Full workflow over the SQLite store and JSON options file
 */

use anyhow::Result;

use polylink::language::LanguageArgs;
use polylink::objects::{ObjectType, TranslatedObject, Translations};
use polylink::options::OptionsStore;
use polylink::registry::ListArgs;
use polylink::store::{BackingStore, ObjectId};
use polylink::JsonOptionsStore;

use crate::common::SqliteFixture;

fn map(entries: &[(&str, ObjectId)]) -> Translations {
    entries
        .iter()
        .map(|(slug, id)| (slug.to_string(), *id))
        .collect()
}

fn setup() -> Result<SqliteFixture> {
    let fixture = SqliteFixture::new()?;
    for (slug, locale, name) in [
        ("en", "en_US", "English"),
        ("fr", "fr_FR", "Français"),
        ("ar", "ar", "العربية"),
    ] {
        fixture.registry.add(LanguageArgs::from_locale(locale).with_order(0))?;
        assert!(fixture.registry.get(slug)?.is_some(), "{} ({}) was added", name, locale);
    }
    Ok(fixture)
}

#[test]
fn test_sqliteRegistry_shouldPersistLanguagesAndOptions() -> Result<()> {
    let fixture = setup()?;

    let reader = fixture.next_request();
    let slugs: Vec<String> = reader
        .get_list(&ListArgs::default())?
        .into_iter()
        .map(|l| l.slug)
        .collect();
    assert_eq!(slugs, vec!["en", "fr", "ar"]);
    assert!(reader.get("ar")?.unwrap().rtl);

    let options = JsonOptionsStore::new(fixture.dir.path().join("options.json")).load()?;
    assert_eq!(options.default_lang, "en");
    Ok(())
}

#[test]
fn test_sqliteRegistry_freshRequest_shouldReadPersistentTier() -> Result<()> {
    let fixture = setup()?;
    fixture.registry.get_list(&ListArgs::default())?;

    let reader = fixture.next_request();
    let before = fixture.store.round_trips();
    assert_eq!(reader.get_list(&ListArgs::default())?.len(), 3);
    // Only the id check reaches the store tables
    assert_eq!(fixture.store.round_trips() - before, 1);
    Ok(())
}

#[test]
fn test_sqliteTranslations_shouldLinkAndValidate() -> Result<()> {
    let fixture = setup()?;
    let posts = TranslatedObject::new(fixture.registry.clone(), ObjectType::post());

    let en = fixture.store.insert_object("post")?;
    let fr = fixture.store.insert_object("post")?;
    let ar = fixture.store.insert_object("post")?;
    posts.translatable().invalidate()?;
    posts.set_language(en, Some("en".into()))?;
    posts.set_language(fr, Some("fr".into()))?;
    posts.set_language(ar, Some("ar".into()))?;

    posts.save_translations(en, &map(&[("fr", fr), ("ar", ar)]))?;

    let reader = TranslatedObject::new(fixture.next_request(), ObjectType::post());
    assert_eq!(
        reader.get_translations(fr)?,
        map(&[("en", en), ("fr", fr), ("ar", ar)])
    );

    reader.delete_translation(ar)?;
    assert_eq!(posts.get_translations(en)?, map(&[("en", en), ("fr", fr)]));
    assert_eq!(fixture.store.nodes("post_translations")?.len(), 1);
    Ok(())
}

#[test]
fn test_sqliteClause_shouldSelectObjectsByLanguage() -> Result<()> {
    let fixture = setup()?;
    let posts = TranslatedObject::new(fixture.registry.clone(), ObjectType::post());

    let ids: Vec<ObjectId> = (0..5)
        .map(|_| fixture.store.insert_object("post"))
        .collect::<Result<_>>()?;
    let term = fixture.store.insert_object("term")?;
    posts.translatable().invalidate()?;
    posts.translatable().set_language_in_mass(&ids[..2], "en")?;
    posts.translatable().set_language_in_mass(&ids[2..4], "fr")?;

    let clause = posts.translatable().clause(&["fr"])?;
    assert_eq!(fixture.store.select_objects("post", &clause)?, ids[2..4].to_vec());

    let clause = posts.translatable().clause(&["en", "fr_FR"])?;
    assert_eq!(fixture.store.select_objects("post", &clause)?, ids[..4].to_vec());

    let clause = posts.translatable().clause(&["xx"])?;
    assert!(fixture.store.select_objects("post", &clause)?.is_empty());

    assert_eq!(posts.translatable().get_objects_with_no_lang(0)?, vec![ids[4]]);
    assert!(!posts.translatable().get_objects_with_no_lang(0)?.contains(&term));
    Ok(())
}

#[test]
fn test_sqliteDelete_shouldCascadeThroughStoreAndOptions() -> Result<()> {
    let fixture = setup()?;
    let posts = TranslatedObject::new(fixture.registry.clone(), ObjectType::post());
    let en = fixture.store.insert_object("post")?;
    let fr = fixture.store.insert_object("post")?;
    posts.translatable().invalidate()?;
    posts.set_language(en, Some("en".into()))?;
    posts.set_language(fr, Some("fr".into()))?;
    posts.save_translations(en, &map(&[("fr", fr)]))?;

    let english = fixture.registry.get("en")?.unwrap();
    fixture.registry.delete(english.id)?;

    let reader = fixture.next_request();
    assert_eq!(reader.default_language()?.unwrap().slug, "fr");
    assert!(fixture.store.nodes("post_translations")?.is_empty());
    assert!(fixture.store.get_node("term_language", english.node_id("term_language").unwrap())?.is_none());

    let posts = TranslatedObject::new(reader, ObjectType::post());
    assert!(posts.get_language(en)?.is_none());
    assert_eq!(posts.get_translations(fr)?, map(&[("fr", fr)]));
    Ok(())
}
