//! Policy file loading and built-in policy presets.
//!
//! Policy files are deserialized by extension: TOML, YAML, or JSON, all
//! sharing the `PolicySpec` shape. The presets cover the common cases so
//! most runs never need a file: `permissive` admits everything,
//! `no_from_imports` pins down import hygiene, and `code_proof` is the
//! restrictive policy for proof files whose support code lives upstream.

use crate::error::ConfigError;
use crate::matchers::PatternId;
use crate::models::policy::{DenySpec, PolicySpec};
use std::fs;
use std::path::Path;

/// Load a policy spec from a file, dispatching on its extension.
pub fn load_policy_spec(path: &Path) -> Result<PolicySpec, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("toml") => toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        Some("json") => serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigError::UnsupportedExtension {
            path: path.to_path_buf(),
        }),
    }
}

fn deny(pattern: PatternId, message: &str) -> DenySpec {
    DenySpec {
        pattern,
        message: message.to_string(),
    }
}

/// Anything goes. Useful for files whose category has no curated policy yet.
pub fn permissive() -> PolicySpec {
    let mut spec = PolicySpec::default();
    spec.global.allow.push(PatternId::Any);
    spec
}

/// Admit everything except imports and exports with a `From` clause;
/// fully qualified forms are eagerly admitted.
pub fn no_from_imports() -> PolicySpec {
    const FROM_MESSAGE: &str =
        "The [From] keyword should not be used; prefer fully qualified [Import]s/[Export]s";

    let mut spec = PolicySpec::default();
    spec.global.eager_allow = vec![PatternId::ImportNoFrom, PatternId::ExportNoFrom];
    spec.global.allow = vec![PatternId::Any];
    spec.global.deny = vec![
        deny(PatternId::Import, FROM_MESSAGE),
        deny(PatternId::Export, FROM_MESSAGE),
    ];
    spec
}

/// The restrictive policy for proof files: declarations, flag settings,
/// and hint registration belong upstream or in a prelude; proof bodies
/// themselves are unrestricted.
pub fn code_proof() -> PolicySpec {
    let mut spec = PolicySpec::default();

    spec.global.eager_allow = vec![PatternId::LocalNotation, PatternId::LocalRegisterHints];
    spec.global.allow = vec![
        PatternId::Import,
        PatternId::Export,
        PatternId::Include,
        PatternId::ContextDecl,
        PatternId::NamespaceOpen,
        PatternId::ImplicitTypes,
        // Overriding pieces of Ltac with idtac is sometimes necessary for
        // performance.
        PatternId::LtacOverrideWithIdtac,
    ];
    spec.global.deny = vec![
        deny(PatternId::SetFlag, "Flags should be set in a prelude file"),
        deny(PatternId::OpenScope, "Scopes should be opened in a prelude file"),
        deny(PatternId::CloseScope, "Scopes should be closed in a prelude file"),
        deny(PatternId::Definition, "Upstream this [Definition]"),
        deny(PatternId::Derive, "Upstream this [derive] clause"),
        deny(PatternId::InteractiveInstance, "Upstream this [Instance]"),
        deny(PatternId::DefinedInstance, "Upstream this [Instance]"),
        deny(PatternId::Inductive, "Upstream this [Inductive] or [Variant]"),
        deny(PatternId::Ltac, "Upstream this [Ltac]"),
        deny(
            PatternId::RegisterHints,
            "Hints should be [#[export]]ed from some hint module",
        ),
        deny(
            PatternId::UnregisterHints,
            "If hints aren't used they shouldn't be imported",
        ),
    ];

    // Proof bodies are unrestricted; mid-proof hint registration is admitted
    // ahead of the global deny.
    spec.proof.eager_allow = vec![PatternId::RegisterHints, PatternId::UnregisterHints];
    spec.proof.allow = vec![PatternId::Any];

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r#"
                [global]
                allow = ["any"]
                [[global.deny]]
                pattern = "set_flag"
                message = "no flags"
            "#,
        );
        let spec = load_policy_spec(file.path()).unwrap();
        assert_eq!(spec.global.allow, vec![PatternId::Any]);
        assert_eq!(spec.global.deny[0].pattern, PatternId::SetFlag);
    }

    #[test]
    fn test_load_yaml() {
        let file = write_temp(
            ".yaml",
            "global:\n  eager_allow: [import_no_from]\n  allow: [any]\n",
        );
        let spec = load_policy_spec(file.path()).unwrap();
        assert_eq!(spec.global.eager_allow, vec![PatternId::ImportNoFrom]);
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(".json", r#"{"proof": {"allow": ["any"]}}"#);
        let spec = load_policy_spec(file.path()).unwrap();
        assert_eq!(spec.proof.allow, vec![PatternId::Any]);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".ini", "[global]\n");
        let err = load_policy_spec(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedExtension { .. }));
    }

    #[test]
    fn test_malformed_toml_reports_path() {
        let file = write_temp(".toml", "[global\n");
        let err = load_policy_spec(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_policy_spec(Path::new("/nonexistent/policy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_presets_compile_without_conflicts() {
        Policy::build(&permissive()).unwrap();
        Policy::build(&no_from_imports()).unwrap();
        Policy::build(&code_proof()).unwrap();
    }
}
