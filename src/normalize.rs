//! Query normalization for image searches.
//! Used by the strategies before every backend search and by the normalize-preview tool.
//!
//! Free-text event titles make poor media-search queries: they carry decades,
//! colors and family context that no file description repeats. The rules here
//! rewrite a query into something the repositories actually index.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::models::Language;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Generic visual concept recognised by keyword and replaced wholesale.
pub struct Topic {
    pub name: &'static str,
    pattern: Regex,
    nl: &'static str,
    en: &'static str,
}

impl Topic {
    fn new(name: &'static str, pattern: &str, nl: &'static str, en: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            nl,
            en,
        }
    }

    pub fn term(&self, lang: Language) -> &'static str {
        match lang {
            Language::Nl => self.nl,
            Language::En => self.en,
        }
    }
}

/// Fixed topics, matched against ASCII-folded lowercase text. First match wins.
/// Every canonical term must match its own pattern so normalization is idempotent.
pub static TOPICS: Lazy<Vec<Topic>> = Lazy::new(|| {
    vec![
        Topic::new(
            "sinterklaas",
            r"\b(?:sinterklaas|sint[- ]?nicolaas|pakjesavond|zwarte piet|saint nicholas)",
            "Sinterklaas",
            "Sinterklaas",
        ),
        Topic::new("christmas", r"\b(?:kerst\w*|christmas|xmas)", "Kerstmis", "Christmas"),
        Topic::new("easter", r"\b(?:pasen|paas(?:ei|haas)\w*|easter)", "Pasen", "Easter"),
        Topic::new(
            "new-years-eve",
            r"\b(?:oudejaars\w*|oud en nieuw|jaarwisseling|vuurwerk|new year'?s eve|fireworks)",
            "vuurwerk",
            "fireworks",
        ),
        Topic::new("carnival", r"\b(?:carnaval\w*|carnival)", "Carnaval", "Carnival"),
        Topic::new(
            "kings-day",
            r"\b(?:koningsdag|koninginnedag|king'?s day|queen'?s day)",
            "Koningsdag",
            "King's Day",
        ),
        Topic::new(
            "nightlife",
            r"\b(?:disco\w*|nachtclub\w*|nightclub\w*)",
            "discotheek",
            "nightclub",
        ),
        Topic::new(
            "perfume",
            r"\b(?:parfum\w*|perfume\w*|eau de (?:toilette|cologne)|reukwater)",
            "parfumfles",
            "perfume bottle",
        ),
        Topic::new(
            "bar-token",
            r"\b(?:consumptiemunt\w*|drankmunt\w*|drink tokens?|bar tokens?)",
            "consumptiemunt",
            "drink token",
        ),
        Topic::new(
            "hairstyle",
            r"\b(?:kapsel\w*|matje|vokuhila|mullet|permanentje|hairstyle\w*|haircut)",
            "kapsel",
            "hairstyle",
        ),
    ]
});

/// Decade markers: "jaren '80", "de jaren tachtig", "the 1980s", "'80s", "'90", bare years.
pub static DECADE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:de\s+)?jaren\s+'?\d0(?:'?s)?\b").unwrap(),
        Regex::new(r"(?i)\b(?:de\s+)?jaren\s+(?:twintig|dertig|veertig|vijftig|zestig|zeventig|tachtig|negentig)\b").unwrap(),
        Regex::new(r"(?i)\bthe\s+(?:19|20)?\d0'?s\b").unwrap(),
        Regex::new(r"(?i)\bthe\s+(?:twenties|thirties|forties|fifties|sixties|seventies|eighties|nineties)\b").unwrap(),
        Regex::new(r"(?i)'?\b(?:19|20)?\d0'?s\b").unwrap(),
        Regex::new(r"'\d0\b").unwrap(),
        Regex::new(r"\b(?:1[0-9]|20)\d{2}\b").unwrap(),
    ]
});

/// Nostalgia adjectives that only add noise to a media search.
pub static NOSTALGIA_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:vintage|retro|interior|interieur|nostalgisch\w*|nostalgic|ouderwetse?)\b").unwrap()
});

/// Color adjectives, Dutch.
pub static COLORS_NL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:rood|rode|blauw|blauwe|groen|groene|geel|gele|oranje|paars|paarse|roze|zwart|zwarte|wit|witte|bruin|bruine|grijs|grijze|gouden|zilveren|beige)\b").unwrap()
});

/// Color adjectives, English.
pub static COLORS_EN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:red|blue|green|yellow|orange|purple|pink|black|white|brown|grey|gray|golden|silver|beige)\b").unwrap()
});

/// Parentheses left behind after their content was stripped.
static EMPTY_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[]\s*[\)\]]").unwrap());

/// Parenthesised or bracketed asides: "(film)", "[1981]".
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\(\[][^\)\]]*[\)\]]").unwrap());

/// Regex to collapse multiple whitespace into single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// "artist - title" separator
static ARTIST_TITLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-–—]\s+").unwrap());

// ============================================================================
// WEATHER
// ============================================================================

/// Below this length a simplified weather query falls back to the bare phenomenon.
pub const MIN_WEATHER_QUERY_LEN: usize = 4;

/// Weather phenomena, matched against ASCII-folded lowercase text.
/// Closed word lists: compounds like "brainstorm" or "sneeuwwitje" are not weather.
static WEATHER: Lazy<Vec<Topic>> = Lazy::new(|| {
    vec![
        Topic::new(
            "snow",
            r"\b(?:sneeuw(?:val|storm|jacht|chaos|buien?|dek)?|snow(?:fall|storm|s)?|blizzard)\b",
            "sneeuw",
            "snow",
        ),
        Topic::new(
            "heatwave",
            r"\b(?:hittegolf|hittegolven|hitte|heat ?waves?)\b",
            "hittegolf",
            "heatwave",
        ),
        Topic::new(
            "cold-spell",
            r"\b(?:koudegolf|koudegolven|vorstperiode|strenge vorst|cold (?:spell|snap|wave))\b",
            "koudegolf",
            "cold spell",
        ),
        Topic::new(
            "flood",
            r"\b(?:overstroming(?:en)?|watersnood(?:ramp)?|stormvloed|dijkdoorbraak|floods?|flooding)\b",
            "overstroming",
            "flood",
        ),
        Topic::new(
            "storm",
            r"\b(?:storm(?:en|schade|s)?|windhoos|orkaan|hurricane|windstorm)\b",
            "storm",
            "storm",
        ),
        Topic::new("drought", r"\b(?:droogte|drought)\b", "droogte", "drought"),
    ]
});

/// Function words that may dangle at either end once place names are gone.
const EDGE_FILLERS: &[&str] = &[
    "in", "op", "bij", "te", "rond", "nabij", "boven", "over", "van", "de", "het", "een", "at",
    "on", "near", "across", "of", "the", "a", "en", "and",
];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during normalization.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to ASCII by applying NFKD decomposition and removing combining marks.
/// e.g., "Café Wintertuin" → "cafe wintertuin", "Curaçao" → "curacao"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

fn collapse(s: &str) -> String {
    let cleaned = EMPTY_BRACKETS.replace_all(s, " ");
    MULTI_SPACE
        .replace_all(&cleaned, " ")
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '–' | '—')
        })
        .to_string()
}

/// Canonical term of the first fixed topic the query mentions.
pub fn topic_term(query: &str, lang: Language) -> Option<&'static str> {
    let folded = fold_to_ascii(query);
    TOPICS
        .iter()
        .find(|topic| topic.pattern.is_match(&folded))
        .map(|topic| topic.term(lang))
}

/// Name of the first fixed topic the query mentions.
pub fn topic_name(query: &str) -> Option<&'static str> {
    let folded = fold_to_ascii(query);
    TOPICS
        .iter()
        .find(|topic| topic.pattern.is_match(&folded))
        .map(|topic| topic.name)
}

fn colors_for(lang: Language) -> &'static Regex {
    match lang {
        Language::Nl => &COLORS_NL,
        Language::En => &COLORS_EN,
    }
}

/// One pass of decade, nostalgia and color stripping.
fn strip_once(query: &str, lang: Language) -> String {
    let mut result = query.to_string();
    for pattern in DECADE_PATTERNS.iter() {
        result = pattern.replace_all(&result, " ").to_string();
    }
    result = NOSTALGIA_WORDS.replace_all(&result, " ").to_string();
    result = colors_for(lang).replace_all(&result, " ").to_string();
    collapse(&result)
}

/// Strip until nothing changes. Each changing pass shortens the string.
pub fn strip_decades_and_colors(query: &str, lang: Language) -> String {
    let mut current = collapse(query);
    loop {
        let next = strip_once(&current, lang);
        if next == current {
            return current;
        }
        current = next;
    }
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Rewrite a raw query into a search-friendly one.
///
/// A fixed-topic keyword anywhere in the query replaces the whole query with the
/// topic's canonical term. Otherwise decades, nostalgia words and colors are
/// stripped. If stripping leaves nothing, the original query is returned.
pub fn normalize_query(query: &str, lang: Language) -> String {
    if let Some(term) = topic_term(query, lang) {
        return term.to_string();
    }

    let stripped = strip_decades_and_colors(query, lang);
    if stripped.is_empty() {
        return query.to_string();
    }

    // Stripping can bring two words of a multi-word keyword together
    topic_term(&stripped, lang)
        .map(str::to_string)
        .unwrap_or(stripped)
}

/// Simplify a weather query to the phenomenon itself.
/// Returns `None` when the query names no known weather phenomenon.
///
/// Leading/trailing years, place names (capitalised words) and dangling
/// function words are removed. e.g., "Sneeuwstorm in Friesland 1979" → "Sneeuwstorm"
pub fn simplify_weather_query(query: &str, lang: Language) -> Option<String> {
    let folded = fold_to_ascii(query);
    let phenomenon = WEATHER.iter().find(|w| w.pattern.is_match(&folded))?;

    // A capitalised phenomenon inside the query is part of a name ("Operatie Desert Storm")
    let all_tokens: Vec<&str> = query.split_whitespace().collect();
    let starts_phenomenon = |i: usize| {
        let rest = fold_to_ascii(&all_tokens[i..].join(" "));
        let rest = rest.trim_start_matches(|c: char| !c.is_alphanumeric());
        phenomenon.pattern.find(rest).is_some_and(|m| m.start() == 0)
    };
    let start = (0..all_tokens.len()).find(|&i| starts_phenomenon(i))?;
    let capitalised = all_tokens[start]
        .chars()
        .find(|c| c.is_alphanumeric())
        .is_some_and(char::is_uppercase);
    if start > 0 && capitalised {
        return None;
    }

    let is_weather_token = |token: &str| phenomenon.pattern.is_match(&fold_to_ascii(token));
    let is_droppable = |token: &str| {
        let bare = token.trim_matches(|c: char| !c.is_alphanumeric());
        if bare.is_empty() {
            return true;
        }
        if bare.len() == 4 && bare.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        if EDGE_FILLERS.contains(&bare.to_lowercase().as_str()) {
            return true;
        }
        bare.chars().next().is_some_and(char::is_uppercase) && !is_weather_token(bare)
    };

    let mut tokens = all_tokens;
    while tokens.first().is_some_and(|t| is_droppable(t)) {
        tokens.remove(0);
    }
    while tokens.last().is_some_and(|t| is_droppable(t)) {
        tokens.pop();
    }

    let simplified = tokens.join(" ");
    if simplified.chars().count() < MIN_WEATHER_QUERY_LEN {
        Some(phenomenon.term(lang).to_string())
    } else {
        Some(simplified)
    }
}

/// Clean a query for the media database: no asides in brackets, no years or decades.
/// e.g., "Dallas (tv-serie) 1981" → "Dallas"
pub fn clean_media_db_query(query: &str) -> String {
    let mut result = BRACKETED.replace_all(query, " ").to_string();
    for pattern in DECADE_PATTERNS.iter() {
        result = pattern.replace_all(&result, " ").to_string();
    }
    result = result.replace(['"', '\u{201C}', '\u{201D}'], " ");
    let cleaned = collapse(&result);
    if cleaned.is_empty() {
        query.trim().to_string()
    } else {
        cleaned
    }
}

/// Extract the artist from an "artist - title" music query.
/// Returns None if there is no separator or the artist part is empty.
pub fn extract_artist(music_query: &str) -> Option<String> {
    let m = ARTIST_TITLE_SEPARATOR.find(music_query)?;
    let artist = music_query[..m.start()].trim();
    if artist.is_empty() {
        None
    } else {
        Some(artist.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
