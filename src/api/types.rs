//! Core data model: the `ApiIndex` JSON contract and usage/coverage results.
//!
//! Everything here is immutable once the extraction pass completes. The JSON
//! shape (camelCase keys, nulls omitted, arrays always present) is the source
//! of truth for downstream prompt generation.

use serde::{Deserialize, Serialize};

// ─── Type kind ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    Class,
    Record,
    RecordStruct,
    Struct,
    Interface,
    Enum,
    Delegate,
    /// Externally-referenced type whose declaration is not visible; used for
    /// dependency surface entries.
    Type,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Record => "record",
            Self::RecordStruct => "record-struct",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Delegate => "delegate",
            Self::Type => "type",
        }
    }

    /// Kinds that cannot carry a base class.
    pub fn is_baseless(&self) -> bool {
        matches!(self, Self::Interface | Self::Enum | Self::Delegate | Self::Type)
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Member kind ─────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Ctor,
    Method,
    Property,
    Indexer,
    Event,
    Const,
    Field,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ctor => "ctor",
            Self::Method => "method",
            Self::Property => "property",
            Self::Indexer => "indexer",
            Self::Event => "event",
            Self::Const => "const",
            Self::Field => "field",
        }
    }
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Member ──────────────────────────────────────────────────────────

/// A declared public member. `sig` is the compressed signature and the
/// deduplication key within one type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub sig: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
}

// ─── Type ────────────────────────────────────────────────────────────

/// A declared type. `name` keeps generic parameters as written in source
/// (e.g. `Response<T>`); `(name, declaring namespace)` is unique per index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberInfo>>,
    /// Enum value names in declaration order; only for `kind == Enum`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            entry_point: None,
            is_error: None,
            re_exported_from: None,
            base: None,
            interfaces: None,
            doc: None,
            members: None,
            values: None,
        }
    }

    /// True when the type declares at least one method member.
    pub fn has_methods(&self) -> bool {
        self.members
            .as_deref()
            .is_some_and(|ms| ms.iter().any(|m| m.kind == MemberKind::Method))
    }

    /// True when the type declares at least one property member.
    pub fn has_properties(&self) -> bool {
        self.members
            .as_deref()
            .is_some_and(|ms| ms.iter().any(|m| m.kind == MemberKind::Property))
    }
}

// ─── Namespace ───────────────────────────────────────────────────────

/// Types grouped under one declaring namespace. An empty `name` denotes the
/// global namespace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceInfo {
    pub name: String,
    pub types: Vec<TypeInfo>,
}

// ─── Dependency ──────────────────────────────────────────────────────

/// Externally-referenced surface grouped by originating package. Types here
/// carry `kind` but typically no members.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyInfo {
    pub package: String,
    pub types: Vec<TypeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stdlib: Option<bool>,
}

// ─── ApiIndex ────────────────────────────────────────────────────────

/// Top-level result of one extraction run.
///
/// Invariants: `namespaces` sorted by name (ascending, case-sensitive) with
/// `types` sorted within; `dependencies` sorted by package name; every type
/// under `namespaces` originates from the parsed source tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiIndex {
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub namespaces: Vec<NamespaceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyInfo>>,
}

impl ApiIndex {
    /// Iterate `(namespace, type)` pairs across the whole index.
    pub fn all_types(&self) -> impl Iterator<Item = (&str, &TypeInfo)> {
        self.namespaces
            .iter()
            .flat_map(|ns| ns.types.iter().map(move |t| (ns.name.as_str(), t)))
    }

    pub fn type_count(&self) -> usize {
        self.namespaces.iter().map(|ns| ns.types.len()).sum()
    }
}

// ─── Usage / coverage ────────────────────────────────────────────────

/// A `(clientType, operation)` pair demonstrated by a call site in the
/// sample corpus.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoveredOperation {
    pub client_type: String,
    pub operation: String,
    pub file: String,
    pub line: u32,
}

/// A declared client operation with no demonstrating call site.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredOperation {
    pub client_type: String,
    pub operation: String,
    pub signature: String,
}

/// Coverage result for one sample corpus scan.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageIndex {
    pub file_count: usize,
    pub covered_operations: Vec<CoveredOperation>,
    pub uncovered_operations: Vec<UncoveredOperation>,
    /// Non-fatal analyzer errors (helper failures, protocol violations).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

// ─── Extraction stats ────────────────────────────────────────────────

/// Side-channel statistics for one extraction run; reported on stderr, never
/// serialized into the `ApiIndex` contract.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStats {
    pub file_count: usize,
    pub parse_errors: usize,
    pub lossy_file_count: usize,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&TypeKind::RecordStruct).unwrap(), "\"record-struct\"");
        assert_eq!(serde_json::to_string(&TypeKind::Class).unwrap(), "\"class\"");
        assert_eq!(serde_json::to_string(&MemberKind::Ctor).unwrap(), "\"ctor\"");
    }

    #[test]
    fn test_index_json_omits_nulls_and_uses_camel_case() {
        let index = ApiIndex {
            package: "Acme.Sdk".to_string(),
            version: None,
            namespaces: vec![NamespaceInfo {
                name: "Acme".to_string(),
                types: vec![TypeInfo::new("Widget", TypeKind::Class)],
            }],
            dependencies: None,
        };
        let json = serde_json::to_string(&index).unwrap();
        assert!(!json.contains("version"));
        assert!(!json.contains("dependencies"));
        assert!(!json.contains("entry_point"));
        assert!(json.contains("\"namespaces\""));
    }

    #[test]
    fn test_member_json_camel_case_flags() {
        let m = MemberInfo {
            name: "GetAsync".to_string(),
            kind: MemberKind::Method,
            sig: "Task<Widget> GetAsync(string id)".to_string(),
            doc: None,
            is_static: None,
            is_async: Some(true),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"isAsync\":true"));
        assert!(!json.contains("isStatic"));
    }

    #[test]
    fn test_index_roundtrip_structural_equality() {
        let index = ApiIndex {
            package: "Acme.Sdk".to_string(),
            version: Some("1.2.3".to_string()),
            namespaces: vec![NamespaceInfo {
                name: "Acme".to_string(),
                types: vec![{
                    let mut t = TypeInfo::new("WidgetClient", TypeKind::Class);
                    t.entry_point = Some(true);
                    t.members = Some(vec![MemberInfo {
                        name: "Get".to_string(),
                        kind: MemberKind::Method,
                        sig: "Widget Get(string id)".to_string(),
                        doc: Some("Gets a widget.".to_string()),
                        is_static: None,
                        is_async: None,
                    }]);
                    t
                }],
            }],
            dependencies: Some(vec![DependencyInfo {
                package: "System.Text.Json".to_string(),
                types: vec![TypeInfo::new("JsonSerializer", TypeKind::Type)],
                is_stdlib: Some(true),
            }]),
        };
        let json = serde_json::to_string(&index).unwrap();
        let back: ApiIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn test_has_methods_and_properties() {
        let mut t = TypeInfo::new("Options", TypeKind::Class);
        assert!(!t.has_methods());
        t.members = Some(vec![MemberInfo {
            name: "Timeout".to_string(),
            kind: MemberKind::Property,
            sig: "int Timeout { get; set; }".to_string(),
            doc: None,
            is_static: None,
            is_async: None,
        }]);
        assert!(!t.has_methods());
        assert!(t.has_properties());
    }
}
