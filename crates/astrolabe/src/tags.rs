//! Tolerant classification of model elements by applied tag.
//!
//! A [`TagCategory`] is a registered set of acceptable tag spellings. Models
//! produced by different tools spell the same marker differently (`Block`,
//! `SysML::Blocks::Block`, `cmdo::Component`), so a tag matches a variant when
//! any of the following holds:
//!
//! 1. the tag's name equals the variant,
//! 2. the tag's qualified name equals the variant,
//! 3. the variant contains `::` and ends with `::` plus the tag's name,
//! 4. the tag's profile name, `::` and the tag's name equal the variant.
//!
//! Category membership is not exclusive: one element may match several.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use astrolabe_core::model::{ElementId, Tag};

use crate::index::ModelIndex;

const QUALIFIED_SEPARATOR: &str = "::";

/// Named group of tag variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    Component,
    Block,
    Interface,
    Module,
    Structure,
    Enumeration,
    Union,
    Exception,
    Command,
    Internal,
}

impl TagCategory {
    /// Every category, in registry order.
    pub const ALL: [TagCategory; 10] = [
        TagCategory::Component,
        TagCategory::Block,
        TagCategory::Interface,
        TagCategory::Module,
        TagCategory::Structure,
        TagCategory::Enumeration,
        TagCategory::Union,
        TagCategory::Exception,
        TagCategory::Command,
        TagCategory::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Component => "component",
            TagCategory::Block => "block",
            TagCategory::Interface => "interface",
            TagCategory::Module => "module",
            TagCategory::Structure => "structure",
            TagCategory::Enumeration => "enumeration",
            TagCategory::Union => "union",
            TagCategory::Exception => "exception",
            TagCategory::Command => "command",
            TagCategory::Internal => "internal",
        }
    }

    /// Built-in variants of the category.
    pub fn default_variants(&self) -> &'static [&'static str] {
        match self {
            TagCategory::Component => &["cmdoComponent", "Component", "SysML::Blocks::Block", "Block"],
            TagCategory::Block => &["SysML::Blocks::Block", "Block", "SysML.Blocks.Block", "SysMLBlock"],
            TagCategory::Interface => &[
                "cmdoInterface",
                "Interface",
                "SysML::Ports and Flows::InterfaceBlock",
                "InterfaceBlock",
            ],
            TagCategory::Module => &["cmdoModule", "Module", "Package"],
            TagCategory::Structure => &["cmdoStructure", "Structure", "ValueType", "DataType"],
            TagCategory::Enumeration => &["cmdoEnumeration", "Enumeration", "SysML::Blocks::ValueType"],
            TagCategory::Union => &["cmdoUnion"],
            TagCategory::Exception => &["cmdoException"],
            TagCategory::Command => &["cmdoCommand"],
            TagCategory::Internal => &["cmdoInternal"],
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registered variants per category.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    categories: IndexMap<TagCategory, Vec<String>>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        let categories = TagCategory::ALL
            .iter()
            .map(|category| {
                let variants = category
                    .default_variants()
                    .iter()
                    .map(|variant| (*variant).to_owned())
                    .collect();
                (*category, variants)
            })
            .collect();
        Self { categories }
    }
}

impl TagRegistry {
    /// Adds variants to a category, skipping ones already registered.
    pub fn extend(&mut self, category: TagCategory, variants: impl IntoIterator<Item = String>) {
        let registered = self.categories.entry(category).or_default();
        for variant in variants {
            if !registered.contains(&variant) {
                registered.push(variant);
            }
        }
    }

    /// Returns the variants of a category.
    pub fn variants(&self, category: TagCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Checks one tag against one variant.
///
/// `profile_name` is the name of the tag's owning profile, if it could be
/// resolved.
pub fn tag_matches_variant(tag: &Tag, variant: &str, profile_name: Option<&str>) -> bool {
    let Some(name) = tag.name() else {
        return false;
    };

    if name == variant || tag.qualified_name() == Some(variant) {
        return true;
    }

    if let Some(prefix) = variant.strip_suffix(name) {
        if variant.contains(QUALIFIED_SEPARATOR) && prefix.ends_with(QUALIFIED_SEPARATOR) {
            return true;
        }
    }

    profile_name.is_some_and(|profile| variant == format!("{profile}{QUALIFIED_SEPARATOR}{name}"))
}

/// Classifies elements against a [`TagRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct TagResolver<'i, 'a> {
    index: &'i ModelIndex<'a>,
    registry: &'i TagRegistry,
}

impl<'i, 'a> TagResolver<'i, 'a> {
    pub fn new(index: &'i ModelIndex<'a>, registry: &'i TagRegistry) -> Self {
        Self { index, registry }
    }

    pub fn index(&self) -> &'i ModelIndex<'a> {
        self.index
    }

    /// Returns `true` if some tag applied to `element` matches some variant
    /// of `category`.
    pub fn matches(&self, element: ElementId, category: TagCategory) -> bool {
        let Some(found) = self.index.element(element) else {
            return false;
        };
        let variants = self.registry.variants(category);

        found.tags().iter().any(|tag| {
            let profile_name = match self.index.profile_name(tag) {
                Ok(name) => name,
                Err(err) => {
                    debug!(element:%, tag = tag.name().unwrap_or_default(), err:%; "Ignoring tag profile");
                    None
                }
            };
            variants
                .iter()
                .any(|variant| tag_matches_variant(tag, variant, profile_name))
        })
    }

    /// Returns `true` if `element` matches any of `categories`.
    pub fn matches_any(&self, element: ElementId, categories: &[TagCategory]) -> bool {
        categories
            .iter()
            .any(|category| self.matches(element, *category))
    }

    /// Renders the applied tags of an element for debug output.
    ///
    /// Each tag is written by name, followed by its qualified name in
    /// parentheses when that differs. Untagged elements render as `none`.
    pub fn applied_tag_names(&self, element: ElementId) -> String {
        let tags = self
            .index
            .element(element)
            .map(|found| found.tags())
            .unwrap_or_default();
        if tags.is_empty() {
            return "none".to_owned();
        }

        tags.iter()
            .map(|tag| {
                let name = tag.name().unwrap_or("<unnamed>");
                match tag.qualified_name() {
                    Some(qualified) if qualified != name => format!("{name} ({qualified})"),
                    _ => name.to_owned(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
