//! Build-unit descriptor classification.
//!
//! SDK-style project files declare their SDK on the root element
//! (`<Project Sdk="Microsoft.NET.Sdk">`) or through a child `<Sdk Name="..."/>`
//! element and can be published on their own. Anything else needs the full
//! legacy build tool.

use tracing::warn;

use crate::domain::unit::ProjectKind;

/// Extension of build-unit descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "csproj";

/// Rule used to tell modern descriptors from legacy ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DescriptorRule {
    /// Parse the XML; modern iff the root `Project` declares an SDK.
    #[default]
    SdkAttribute,

    /// Modern iff the raw content contains this marker.
    Marker(String),
}

/// Classifies descriptor content as [`ProjectKind::Modern`] or [`ProjectKind::Legacy`].
#[derive(Debug, Clone, Default)]
pub struct DescriptorClassifier {
    rule: DescriptorRule,
}

impl DescriptorClassifier {
    pub fn new(rule: DescriptorRule) -> Self {
        Self { rule }
    }

    pub fn classify(&self, content: &str) -> ProjectKind {
        let modern = match &self.rule {
            DescriptorRule::SdkAttribute => declares_sdk(content),
            DescriptorRule::Marker(marker) => content.contains(marker.as_str()),
        };
        if modern {
            ProjectKind::Modern
        } else {
            ProjectKind::Legacy
        }
    }
}

fn declares_sdk(content: &str) -> bool {
    let doc = match roxmltree::Document::parse(content) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "descriptor is not well-formed XML, treating as legacy");
            return false;
        }
    };

    let root = doc.root_element();
    if !root.has_tag_name("Project") {
        return false;
    }

    root.attribute("Sdk").is_some_and(|sdk| !sdk.trim().is_empty())
        || root
            .children()
            .filter(|n| n.is_element())
            .any(|n| n.tag_name().name() == "Sdk" && n.attribute("Name").is_some())
}
