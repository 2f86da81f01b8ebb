//! Import alias registry and identifier helpers.
//!
//! The [`NameRegistry`] hands out collision-free aliases for the modules the
//! generated code imports. It lives for a whole generator run so aliases stay
//! consistent across every file produced in one invocation.
//!
//! The case helpers mirror the naming prost applies to messages, fields and
//! packages, so generated code refers to the same identifiers prost emits.

use std::collections::{BTreeMap, HashSet};

use proc_macro2::{Ident, Span};

/// Deduplicates import aliases for one generator run.
///
/// ## Examples
///
/// ```
/// use twirp_gen::naming::NameRegistry;
///
/// let mut registry = NameRegistry::new();
/// assert_eq!(registry.register("twirp"), "twirp");
/// assert_eq!(registry.register("twirp"), "twirp1");
/// assert_eq!(registry.register("twirp"), "twirp2");
/// ```
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    in_use: HashSet<String>,
    aliases: BTreeMap<String, String>,
}

impl NameRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` and returns its alias.
    ///
    /// The first registration returns `name` unchanged; later ones return
    /// `name` followed by the smallest positive integer whose alias is not
    /// already taken.
    pub fn register(&mut self, name: &str) -> String {
        let mut alias = name.to_string();
        let mut i = 1;
        while self.in_use.contains(&alias) {
            alias = format!("{}{}", name, i);
            i += 1;
        }
        self.in_use.insert(alias.clone());
        self.aliases.insert(name.to_string(), alias.clone());
        alias
    }

    /// Returns the most recent alias handed out for `name`.
    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }
}

/// Splits an identifier into words on `_`, `.`, `-` and case boundaries.
///
/// Handles acronyms the way heck does: "HTTPBody" -> ["HTTP", "Body"].
/// Digits stay attached to the preceding word: "v1" -> ["v1"].
fn split_words(s: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for part in s.split(|c: char| !c.is_alphanumeric()).filter(|p| !p.is_empty()) {
        let chars: Vec<(usize, char)> = part.char_indices().collect();
        let mut word_start = 0;

        for i in 1..chars.len() {
            let (idx, current) = chars[i];
            let prev = chars[i - 1].1;
            let next_is_lower = chars.get(i + 1).is_some_and(|(_, c)| c.is_lowercase());

            let is_new_word = current.is_uppercase()
                && (prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower));

            if is_new_word {
                if idx > word_start {
                    words.push(&part[word_start..idx]);
                }
                word_start = idx;
            }
        }

        if word_start < part.len() {
            words.push(&part[word_start..]);
        }
    }
    words
}

/// Converts to snake_case ("GetHTTPStatus" -> "get_http_status").
pub fn to_snake_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Converts to UpperCamelCase ("hello_req" -> "HelloReq", "HTTPBody" -> "HttpBody").
pub fn to_upper_camel_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts to SCREAMING_SNAKE_CASE ("Greeter" -> "GREETER").
pub fn to_constant_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Keywords prost escapes with `r#`.
const RAW_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers; prost appends `_` instead.
const SUFFIXED_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/// Builds an identifier, escaping Rust keywords the way prost does.
pub fn rust_ident(name: &str) -> Ident {
    if SUFFIXED_KEYWORDS.contains(&name) {
        Ident::new(&format!("{}_", name), Span::call_site())
    } else if RAW_KEYWORDS.contains(&name) {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

/// Snake-cased identifier for a proto field or method name.
pub fn field_ident(name: &str) -> Ident {
    rust_ident(&to_snake_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_returns_name_first() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.register("ctxkit"), "ctxkit");
        assert_eq!(registry.alias("ctxkit"), Some("ctxkit"));
    }

    #[test]
    fn register_suffixes_are_gap_free_and_unique() {
        let mut registry = NameRegistry::new();
        let aliases: Vec<String> = (0..5).map(|_| registry.register("x")).collect();
        assert_eq!(aliases, vec!["x", "x1", "x2", "x3", "x4"]);

        let unique: HashSet<&String> = aliases.iter().collect();
        assert_eq!(unique.len(), aliases.len());
    }

    #[test]
    fn register_skips_aliases_taken_by_other_names() {
        let mut registry = NameRegistry::new();
        registry.register("x1");
        assert_eq!(registry.register("x"), "x");
        assert_eq!(registry.register("x"), "x2");
        assert_eq!(registry.alias("x"), Some("x2"));
    }

    #[test]
    fn split_words_handles_acronyms_and_separators() {
        assert_eq!(split_words("HTTPBody"), vec!["HTTP", "Body"]);
        assert_eq!(split_words("GetHTTPStatus"), vec!["Get", "HTTP", "Status"]);
        assert_eq!(split_words("hello_req"), vec!["hello", "req"]);
        assert_eq!(split_words("common.v1"), vec!["common", "v1"]);
        assert_eq!(split_words(""), Vec::<&str>::new());
    }

    #[test]
    fn snake_case_matches_prost() {
        assert_eq!(to_snake_case("Greet"), "greet");
        assert_eq!(to_snake_case("GetHTTPStatus"), "get_http_status");
        assert_eq!(to_snake_case("user_ids"), "user_ids");
        assert_eq!(to_snake_case("v1"), "v1");
        assert_eq!(to_snake_case("ListV2Items"), "list_v2_items");
    }

    #[test]
    fn upper_camel_case_matches_prost() {
        assert_eq!(to_upper_camel_case("HelloReq"), "HelloReq");
        assert_eq!(to_upper_camel_case("HTTPBody"), "HttpBody");
        assert_eq!(to_upper_camel_case("hello_reply"), "HelloReply");
    }

    #[test]
    fn constant_case() {
        assert_eq!(to_constant_case("Greeter"), "GREETER");
        assert_eq!(to_constant_case("UserService"), "USER_SERVICE");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(rust_ident("type").to_string(), "r#type");
        assert_eq!(rust_ident("self").to_string(), "self_");
        assert_eq!(field_ident("Type").to_string(), "r#type");
        assert_eq!(field_ident("userId").to_string(), "user_id");
    }
}
