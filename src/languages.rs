//! Language registry for submission and execution

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How bare statements are turned into a runnable program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Wrapper {
    /// Language runs top-level statements as-is
    None,
    /// Wrap into `public class Main { public static void main(...) }`
    JavaMain,
    /// Wrap into `int main()` with stdio included
    CMain,
    /// Wrap into `int main()` with the standard library included
    CppMain,
}

/// Block syntax family, used by the structural complexity matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStyle {
    /// `{ ... }` delimited blocks, `//` and `/* */` comments
    Braces,
    /// Indentation delimited blocks, `#` comments
    Indentation,
}

/// Configuration for a supported submission language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageProfile {
    /// Internal identifier (e.g., "python")
    pub id: String,
    /// Human readable name shown in the editor
    pub name: String,
    /// Language identifier understood by the remote executor
    pub executor_language: String,
    /// Version identifier understood by the remote executor
    pub executor_version: String,
    /// Name of the single source file sent to the executor (e.g., "Main.java")
    pub entry_file: String,
    pub wrapper: Wrapper,
    pub block_style: BlockStyle,
    /// Default code shown for a fresh editor
    pub template: String,
}

impl LanguageProfile {
    pub fn wraps_bare_statements(&self) -> bool {
        self.wrapper != Wrapper::None
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageProfile {
    name: String,
    executor_language: String,
    executor_version: String,
    entry_file: String,
    #[serde(default = "default_wrapper")]
    wrapper: Wrapper,
    #[serde(default = "default_block_style")]
    block_style: BlockStyle,
    #[serde(default)]
    template: String,
    #[serde(default)]
    aliases: Vec<String>,
}

fn default_wrapper() -> Wrapper {
    Wrapper::None
}

fn default_block_style() -> BlockStyle {
    BlockStyle::Braces
}

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("invalid language table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("language table is empty")]
    Empty,
    #[error("language key or alias `{0}` is defined more than once")]
    Duplicate(String),
}

/// Immutable lookup table of language profiles, keyed by id and aliases
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: BTreeMap<String, Arc<LanguageProfile>>,
    lookup: HashMap<String, Arc<LanguageProfile>>,
}

impl LanguageRegistry {
    /// Registry built from the language table compiled into the binary
    pub fn builtin() -> Result<Self, LanguageError> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml(content)
    }

    /// Parse a language table
    pub fn from_toml(content: &str) -> Result<Self, LanguageError> {
        let raw_profiles: BTreeMap<String, RawLanguageProfile> = toml::from_str(content)?;
        if raw_profiles.is_empty() {
            return Err(LanguageError::Empty);
        }

        let mut profiles = BTreeMap::new();
        let mut lookup = HashMap::new();

        for (id, raw) in raw_profiles {
            let id = id.to_lowercase();
            let profile = Arc::new(LanguageProfile {
                id: id.clone(),
                name: raw.name,
                executor_language: raw.executor_language,
                executor_version: raw.executor_version,
                entry_file: raw.entry_file,
                wrapper: raw.wrapper,
                block_style: raw.block_style,
                template: raw.template,
            });

            // Main id first, then aliases
            for key in std::iter::once(id.clone()).chain(raw.aliases.iter().map(|a| a.to_lowercase())) {
                if lookup.insert(key.clone(), Arc::clone(&profile)).is_some() {
                    return Err(LanguageError::Duplicate(key));
                }
            }
            profiles.insert(id, profile);
        }

        Ok(Self { profiles, lookup })
    }

    /// Get a language profile by id or alias (case-insensitive)
    pub fn get(&self, language: &str) -> Option<Arc<LanguageProfile>> {
        self.lookup.get(&language.trim().to_lowercase()).cloned()
    }

    /// All profiles, ordered by id
    pub fn profiles(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TABLE: &str = r#"
[c]
name = "C"
executor_language = "c"
executor_version = "10.2.0"
entry_file = "main.c"
wrapper = "c-main"

[python]
name = "Python"
executor_language = "python"
executor_version = "3.10.0"
entry_file = "main.py"
block_style = "indentation"
aliases = ["py", "Python3"]
"#;

    #[test]
    fn test_load_languages() {
        let registry = LanguageRegistry::from_toml(TEST_TABLE).unwrap();

        assert_eq!(registry.len(), 2);
        let c = registry.get("c").unwrap();
        assert_eq!(c.entry_file, "main.c");
        assert!(c.wraps_bare_statements());
        assert_eq!(c.block_style, BlockStyle::Braces);

        let py = registry.get("python").unwrap();
        assert!(!py.wraps_bare_statements());
        assert_eq!(py.block_style, BlockStyle::Indentation);
    }

    #[test]
    fn test_aliases_resolve_to_same_profile() {
        let registry = LanguageRegistry::from_toml(TEST_TABLE).unwrap();

        assert_eq!(registry.get("py"), registry.get("python"));
        assert_eq!(registry.get("PYTHON3"), registry.get("python"));
        assert!(registry.get("rust").is_none());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let table = r#"
[a]
name = "A"
executor_language = "a"
executor_version = "1"
entry_file = "a"
aliases = ["b"]

[b]
name = "B"
executor_language = "b"
executor_version = "1"
entry_file = "b"
"#;
        assert!(matches!(
            LanguageRegistry::from_toml(table),
            Err(LanguageError::Duplicate(key)) if key == "b"
        ));
    }

    #[test]
    fn test_builtin_table() {
        let registry = LanguageRegistry::builtin().unwrap();

        for id in ["python", "javascript", "typescript", "java", "cpp", "c"] {
            let profile = registry.get(id).unwrap_or_else(|| panic!("missing {}", id));
            assert!(!profile.template.is_empty(), "{} has no template", id);
        }
        assert_eq!(registry.get("java").unwrap().entry_file, "Main.java");
        assert_eq!(registry.get("c++").unwrap().id, "cpp");

        let ids: Vec<_> = registry.profiles().map(|p| p.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
