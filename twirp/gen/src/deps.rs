//! Cross-package type references.
//!
//! Method signatures may use messages from other proto packages. Each such
//! package is imported once under its short name (the last segment of its
//! Rust module path), and type references are qualified with that short name.
//!
//! Two different packages that end in the same short name share one map
//! entry; the one collected last wins. That is a known limitation of the
//! short-name scheme and is kept as is.

use std::collections::BTreeMap;

use proc_macro2::TokenStream;
use quote::quote;
use tracing::debug;

use crate::config::ExternPath;
use crate::errors::GeneratorError;
use crate::naming::{rust_ident, to_snake_case};
use crate::schema::{MessageRef, Schema};

/// Short package name to Rust module path, for one schema.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyMap {
    deps: BTreeMap<String, String>,
}

impl DependencyMap {
    /// Records every foreign package referenced by a method of `schema`.
    pub fn collect(schema: &Schema, extern_paths: &[ExternPath]) -> Self {
        let mut map = Self::default();
        for service in &schema.services {
            for method in &service.methods {
                for message in [&method.input, &method.output] {
                    if message.package == schema.package {
                        continue;
                    }
                    let path = module_path(&schema.package, &message.package, extern_paths);
                    let short = short_name(&path).to_string();
                    debug!(package = %message.package, %short, %path, "foreign package");
                    map.insert(short, path);
                }
            }
        }
        map
    }

    /// Adds or overwrites the entry for `short`.
    pub fn insert(&mut self, short: String, path: String) {
        self.deps.insert(short, path);
    }

    pub fn contains(&self, short: &str) -> bool {
        self.deps.contains_key(short)
    }

    /// Entries in short-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.deps.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders `use` items for every entry.
    ///
    /// A path of the form `self::<short>` already names a module in scope and
    /// is not imported again.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::CodeGenError` if an entry is not a valid path.
    pub fn use_items(&self) -> Result<TokenStream, GeneratorError> {
        let mut items = TokenStream::new();
        for (short, path) in self.iter() {
            if path == format!("self::{}", short) {
                continue;
            }
            let path: syn::Path = syn::parse_str(path).map_err(|e| {
                GeneratorError::CodeGenError(format!("invalid module path '{}': {}", path, e))
            })?;
            items.extend(quote! {
                #[allow(unused_imports)]
                use #path;
            });
        }
        Ok(items)
    }

    /// Renders a reference to `message` as seen from `current_package`.
    ///
    /// The reference is qualified only when the message comes from another
    /// package whose short name is in the map; otherwise it is unqualified.
    pub fn type_tokens(
        &self,
        message: &MessageRef,
        current_package: &str,
        extern_paths: &[ExternPath],
    ) -> TokenStream {
        let segments = message.type_path.iter().map(|s| rust_ident(s));
        if message.package != current_package {
            let path = module_path(current_package, &message.package, extern_paths);
            let short = short_name(&path);
            if self.contains(short) {
                let short = rust_ident(short);
                return quote! { #short #(:: #segments)* };
            }
        }
        quote! { #(#segments)::* }
    }

    /// Plain-text form of [`DependencyMap::type_tokens`], for messages.
    pub fn type_name(
        &self,
        message: &MessageRef,
        current_package: &str,
        extern_paths: &[ExternPath],
    ) -> String {
        if message.package != current_package {
            let path = module_path(current_package, &message.package, extern_paths);
            let short = short_name(&path);
            if self.contains(short) {
                return format!("{}::{}", short, message.rust_name());
            }
        }
        message.rust_name()
    }
}

/// Rust module path of `target` as seen from the module of `current`.
///
/// The longest matching `extern_path` wins; remaining package segments are
/// appended snake-cased. Without a match the path climbs out of the current
/// package with `super::` and descends into the target, the layout produced
/// when every package is a nested module of one crate.
///
/// ## Examples
///
/// ```
/// use twirp_gen::deps::module_path;
///
/// assert_eq!(module_path("pkg", "common.v1", &[]), "super::common::v1");
/// assert_eq!(module_path("a.b", "common", &[]), "super::super::common");
/// assert_eq!(module_path("", "common", &[]), "self::common");
/// ```
pub fn module_path(current: &str, target: &str, extern_paths: &[ExternPath]) -> String {
    let qualified = format!(".{}", target);
    let best = extern_paths
        .iter()
        .filter(|e| {
            qualified == e.proto_package
                || qualified.starts_with(&format!("{}.", e.proto_package))
        })
        .max_by_key(|e| e.proto_package.len());

    if let Some(extern_path) = best {
        let rest = &qualified[extern_path.proto_package.len()..];
        let mut path = extern_path.rust_path.clone();
        for segment in rest.split('.').filter(|s| !s.is_empty()) {
            path.push_str("::");
            path.push_str(&to_snake_case(segment));
        }
        return path;
    }

    let depth = current.split('.').filter(|s| !s.is_empty()).count();
    let mut segments: Vec<String> = if depth == 0 {
        vec!["self".to_string()]
    } else {
        vec!["super".to_string(); depth]
    };
    segments.extend(
        target
            .split('.')
            .filter(|s| !s.is_empty())
            .map(to_snake_case),
    );
    segments.join("::")
}

/// Last segment of a `::` separated path.
pub fn short_name(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
