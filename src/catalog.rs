/*!
 * Predefined languages and bundled flags.
 *
 * The catalogue offers ready-made arguments for common locales; the flag
 * list names the flag assets shipped with the engine.
 */

/// One predefined language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub locale: &'static str,
    pub slug: &'static str,
    pub name: &'static str,
    pub rtl: bool,
    pub flag: &'static str,
}

const fn entry(
    locale: &'static str,
    slug: &'static str,
    name: &'static str,
    rtl: bool,
    flag: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        locale,
        slug,
        name,
        rtl,
        flag,
    }
}

/// Predefined languages, keyed by locale
pub static LANGUAGES: &[CatalogEntry] = &[
    entry("af", "af", "Afrikaans", false, "za"),
    entry("ar", "ar", "العربية", true, "arab"),
    entry("bg_BG", "bg", "български", false, "bg"),
    entry("bn_BD", "bn", "বাংলা", false, "bd"),
    entry("ca", "ca", "Català", false, "catalonia"),
    entry("cs_CZ", "cs", "Čeština", false, "cz"),
    entry("cy", "cy", "Cymraeg", false, "wales"),
    entry("da_DK", "da", "Dansk", false, "dk"),
    entry("de_CH", "de", "Deutsch", false, "ch"),
    entry("de_DE", "de", "Deutsch", false, "de"),
    entry("el", "el", "Ελληνικά", false, "gr"),
    entry("en_AU", "en", "English", false, "au"),
    entry("en_CA", "en", "English", false, "ca"),
    entry("en_GB", "en", "English", false, "gb"),
    entry("en_US", "en", "English", false, "us"),
    entry("eo", "eo", "Esperanto", false, "esperanto"),
    entry("es_ES", "es", "Español", false, "es"),
    entry("es_MX", "es", "Español de México", false, "mx"),
    entry("et", "et", "Eesti", false, "ee"),
    entry("eu", "eu", "Euskara", false, "basque"),
    entry("fa_IR", "fa", "فارسی", true, "ir"),
    entry("fi", "fi", "Suomi", false, "fi"),
    entry("fr_BE", "fr", "Français", false, "be"),
    entry("fr_CA", "fr", "Français", false, "quebec"),
    entry("fr_FR", "fr", "Français", false, "fr"),
    entry("ga", "ga", "Gaeilge", false, "ie"),
    entry("gl_ES", "gl", "Galego", false, "galicia"),
    entry("he_IL", "he", "עברית", true, "il"),
    entry("hi_IN", "hi", "हिन्दी", false, "in"),
    entry("hr", "hr", "Hrvatski", false, "hr"),
    entry("hu_HU", "hu", "Magyar", false, "hu"),
    entry("id_ID", "id", "Bahasa Indonesia", false, "id"),
    entry("is_IS", "is", "Íslenska", false, "is"),
    entry("it_IT", "it", "Italiano", false, "it"),
    entry("ja", "ja", "日本語", false, "jp"),
    entry("ko_KR", "ko", "한국어", false, "kr"),
    entry("lt_LT", "lt", "Lietuviškai", false, "lt"),
    entry("lv", "lv", "Latviešu valoda", false, "lv"),
    entry("nb_NO", "nb", "Norsk Bokmål", false, "no"),
    entry("nl_BE", "nl", "Nederlands", false, "be"),
    entry("nl_NL", "nl", "Nederlands", false, "nl"),
    entry("pl_PL", "pl", "Polski", false, "pl"),
    entry("pt_BR", "pt", "Português", false, "br"),
    entry("pt_PT", "pt", "Português", false, "pt"),
    entry("ro_RO", "ro", "Română", false, "ro"),
    entry("ru_RU", "ru", "Русский", false, "ru"),
    entry("sk_SK", "sk", "Slovenčina", false, "sk"),
    entry("sl_SI", "sl", "Slovenščina", false, "si"),
    entry("sr_RS", "sr", "Српски језик", false, "rs"),
    entry("sv_SE", "sv", "Svenska", false, "se"),
    entry("th", "th", "ไทย", false, "th"),
    entry("tr_TR", "tr", "Türkçe", false, "tr"),
    entry("uk", "uk", "Українська", false, "ua"),
    entry("ur", "ur", "اردو", true, "pk"),
    entry("vi", "vi", "Tiếng Việt", false, "vn"),
    entry("zh_CN", "zh", "中文 (中国)", false, "cn"),
    entry("zh_HK", "zh", "中文 (香港)", false, "hk"),
    entry("zh_TW", "zh", "中文 (台灣)", false, "tw"),
];

/// Flag codes shipped with the engine
pub static BUNDLED_FLAGS: &[&str] = &[
    "ad", "ae", "af", "al", "am", "ar", "arab", "at", "au", "az", "ba", "bd", "be", "bg", "bh",
    "bo", "br", "basque", "by", "ca", "catalonia", "ch", "cl", "cn", "co", "cr", "cu", "cy", "cz",
    "de", "dk", "do", "dz", "ec", "ee", "eg", "es", "esperanto", "et", "eu", "fi", "fr", "galicia",
    "gb", "ge", "gr", "gt", "hk", "hn", "hr", "hu", "id", "ie", "il", "in", "iq", "ir", "is", "it",
    "jo", "jp", "ke", "kr", "kw", "kz", "lb", "li", "lt", "lu", "lv", "ma", "mc", "md", "me", "mk",
    "mt", "mx", "my", "ng", "ni", "nl", "no", "np", "nz", "pa", "pe", "ph", "pk", "pl", "pt", "py",
    "qa", "quebec", "ro", "rs", "ru", "sa", "scotland", "se", "sg", "si", "sk", "sn", "sv", "th",
    "tn", "tr", "tw", "ua", "us", "uy", "uz", "ve", "vn", "wales", "za",
];

/// Predefined language for a locale
pub fn find(locale: &str) -> Option<&'static CatalogEntry> {
    LANGUAGES.iter().find(|e| e.locale == locale)
}

/// Whether a flag code is shipped with the engine
pub fn is_bundled_flag(code: &str) -> bool {
    BUNDLED_FLAGS.contains(&code)
}
