//! The code-bundle document served by the delivery endpoint.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Ordered mapping from bundle-relative path to base64-encoded content.
///
/// Key order is the document's own: installation iterates entries in the
/// order the endpoint sent them, not re-sorted. A bundle is received once
/// per patch run and is not persisted beyond the install step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBundle {
    entries: Vec<(String, String)>,
}

impl CodeBundle {
    /// Build a bundle from already-encoded entries, preserving their order.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Entries as `(relative path, base64 content)`, in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for CodeBundle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BundleVisitor;

        impl<'de> Visitor<'de> for BundleVisitor {
            type Value = CodeBundle;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of relative path to base64-encoded content")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(CodeBundle { entries })
            }
        }

        deserializer.deserialize_map(BundleVisitor)
    }
}

/// Response body of the bundle endpoint.
///
/// The endpoint may send more than `code`; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleDocument {
    pub code: CodeBundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_in_document_order() {
        // Keys deliberately out of lexicographic order.
        let raw = r#"{"zeta/mod.py": "eA==", "alpha/__init__.py": "", "mid.py": "eQ=="}"#;
        let bundle: CodeBundle = serde_json::from_str(raw).unwrap();
        let paths: Vec<&str> = bundle.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, ["zeta/mod.py", "alpha/__init__.py", "mid.py"]);
    }

    #[test]
    fn document_ignores_unknown_top_level_fields() {
        let raw = r#"{"version": 4, "code": {"pkg/a.py": "eD0x"}, "issued_at": "now"}"#;
        let document: BundleDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(document.code.len(), 1);
        assert_eq!(document.code.iter().next(), Some(("pkg/a.py", "eD0x")));
    }

    #[test]
    fn rejects_non_object_code_field() {
        let raw = r#"{"code": ["pkg/a.py"]}"#;
        assert!(serde_json::from_str::<BundleDocument>(raw).is_err());
    }

    #[test]
    fn empty_bundle() {
        let bundle: CodeBundle = serde_json::from_str("{}").unwrap();
        assert!(bundle.is_empty());
        assert_eq!(bundle.len(), 0);
    }
}
