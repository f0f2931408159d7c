/*!
 * Validation of language arguments.
 *
 * All blocking rules are evaluated and collected before anything is
 * persisted. A language being updated is checked against every language
 * except itself.
 */

use crate::errors::{ValidationError, ValidationErrors};
use crate::language::{Language, LanguageArgs};
use crate::language_utils::{is_valid_locale, is_valid_slug, locale_as_slug};
use crate::store::NodeId;

use super::collaborators::FlagResolver;

/// Validate arguments and return the slug the language will be stored under
///
/// `own` is the id of the language being updated, `None` when adding. When
/// adding a language whose slug already belongs to a language with another
/// locale, the lowercased locale becomes the effective slug.
pub fn validate_language(
    args: &LanguageArgs,
    existing: &[Language],
    own: Option<NodeId>,
    flags: &dyn FlagResolver,
) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if !is_valid_locale(&args.locale) {
        errors.push(ValidationError::InvalidLocale(args.locale.clone()));
    }

    if !is_valid_slug(&args.slug) {
        errors.push(ValidationError::InvalidSlug(args.slug.clone()));
    }

    if args.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    if let Some(code) = args.flag_code.as_deref().filter(|c| !c.is_empty()) {
        if !flags.exists(code) {
            errors.push(ValidationError::InvalidFlag(code.to_string()));
        }
    }

    let others: Vec<&Language> = existing.iter().filter(|l| Some(l.id) != own).collect();
    let mut slug = args.slug.clone();

    if others
        .iter()
        .any(|l| l.slug == args.slug && l.locale == args.locale)
    {
        errors.push(ValidationError::NonUniqueSlug {
            slug: args.slug.clone(),
            locale: args.locale.clone(),
        });
    } else if others.iter().any(|l| l.slug == args.slug) {
        if own.is_none() {
            // Same code, another locale: store under the locale instead
            slug = locale_as_slug(&args.locale);
            if others.iter().any(|l| l.slug == slug) {
                errors.push(ValidationError::NonUniqueSlug {
                    slug: slug.clone(),
                    locale: args.locale.clone(),
                });
            }
        } else {
            errors.push(ValidationError::NonUniqueSlug {
                slug: args.slug.clone(),
                locale: args.locale.clone(),
            });
        }
    }

    errors.into_result().map(|_| slug)
}
