//! Language detection and tree-sitter grammar registry.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Language key known to the resolver. Not every key has a compiled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Bash,
    Toml,
    Json,
    Markdown,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Kotlin,
    Swift,
    Lua,
    Yaml,
    Dockerfile,
    Makefile,
}

impl Lang {
    pub const ALL: [Self; 22] = [
        Self::Rust,
        Self::Python,
        Self::JavaScript,
        Self::TypeScript,
        Self::Tsx,
        Self::Go,
        Self::Bash,
        Self::Toml,
        Self::Json,
        Self::Markdown,
        Self::Java,
        Self::C,
        Self::Cpp,
        Self::CSharp,
        Self::Ruby,
        Self::Php,
        Self::Kotlin,
        Self::Swift,
        Self::Lua,
        Self::Yaml,
        Self::Dockerfile,
        Self::Makefile,
    ];

    /// Identifier used in payload records and config.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Go => "go",
            Self::Bash => "bash",
            Self::Toml => "toml",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Kotlin => "kotlin",
            Self::Swift => "swift",
            Self::Lua => "lua",
            Self::Yaml => "yaml",
            Self::Dockerfile => "dockerfile",
            Self::Makefile => "makefile",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|l| l.id() == id)
    }

    /// Primary tree-sitter grammar. Returns `None` if the language has no grammar
    /// or the corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-rust")]
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            #[cfg(feature = "lang-js")]
            Self::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            #[cfg(feature = "lang-go")]
            Self::Go => Some(tree_sitter_go::LANGUAGE.into()),
            #[cfg(feature = "lang-config")]
            Self::Bash => Some(tree_sitter_bash::LANGUAGE.into()),
            #[cfg(feature = "lang-config")]
            Self::Toml => Some(tree_sitter_toml_ng::LANGUAGE.into()),
            #[cfg(feature = "lang-config")]
            Self::Json => Some(tree_sitter_json::LANGUAGE.into()),
            #[cfg(feature = "lang-config")]
            Self::Markdown => Some(tree_sitter_md::LANGUAGE.into()),
            #[cfg(feature = "lang-java")]
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            #[cfg(feature = "lang-c")]
            Self::C => Some(tree_sitter_c::LANGUAGE.into()),
            #[cfg(feature = "lang-c")]
            Self::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Secondary grammar export tried when the primary one is rejected.
    /// TypeScript sources are a subset of TSX, and C sources parse under C++.
    #[must_use]
    pub fn alternate_grammar(self) -> Option<tree_sitter::Language> {
        match self {
            Self::TypeScript => Self::Tsx.grammar(),
            Self::Tsx => Self::TypeScript.grammar(),
            Self::JavaScript => Self::Tsx.grammar(),
            Self::C => Self::Cpp.grammar(),
            _ => None,
        }
    }

    /// Node kinds that count as a top-level declaration during generic extraction.
    #[must_use]
    pub fn declaration_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &[
                "function_item",
                "struct_item",
                "enum_item",
                "trait_item",
                "impl_item",
                "mod_item",
                "macro_definition",
            ],
            Self::Python => &[
                "function_definition",
                "class_definition",
                "decorated_definition",
            ],
            Self::JavaScript | Self::TypeScript | Self::Tsx => &[
                "function_declaration",
                "class_declaration",
                "method_definition",
                "interface_declaration",
            ],
            Self::Go => &[
                "function_declaration",
                "method_declaration",
                "type_declaration",
            ],
            Self::Bash => &["function_definition"],
            Self::Toml => &["table", "table_array_element"],
            Self::Json => &["pair"],
            Self::Markdown => &["section"],
            Self::Java => &[
                "class_declaration",
                "interface_declaration",
                "method_declaration",
                "constructor_declaration",
            ],
            Self::C | Self::Cpp => &[
                "function_definition",
                "struct_specifier",
                "class_specifier",
                "namespace_definition",
            ],
            _ => &[],
        }
    }

    /// True when a grammar is compiled into this build.
    #[must_use]
    pub fn has_grammar(self) -> bool {
        self.grammar().is_some()
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| format!("unknown language `{s}`"))
    }
}

/// Static description of how a language is recognized.
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    pub lang: Lang,
    /// Extensions without the leading dot. Multi-part suffixes such as `d.ts` are allowed.
    pub extensions: &'static [&'static str],
    /// Exact file names, compared case-sensitively.
    pub file_names: &'static [&'static str],
    pub has_query: bool,
}

pub static PROFILES: &[LanguageProfile] = &[
    LanguageProfile {
        lang: Lang::Rust,
        extensions: &["rs"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::Python,
        extensions: &["py", "pyi", "pyw"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::JavaScript,
        extensions: &["js", "jsx", "mjs", "cjs"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::TypeScript,
        extensions: &["ts", "mts", "cts", "d.ts"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::Tsx,
        extensions: &["tsx"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::Go,
        extensions: &["go"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::Bash,
        extensions: &["sh", "bash", "zsh"],
        file_names: &[".bashrc", ".zshrc", ".profile"],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::Toml,
        extensions: &["toml"],
        file_names: &["Cargo.lock"],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Json,
        extensions: &["json", "jsonc"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Markdown,
        extensions: &["md", "markdown"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Java,
        extensions: &["java"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::C,
        extensions: &["c", "h"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::Cpp,
        extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        file_names: &[],
        has_query: true,
    },
    LanguageProfile {
        lang: Lang::CSharp,
        extensions: &["cs"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Ruby,
        extensions: &["rb", "rake", "gemspec"],
        file_names: &["Rakefile", "Gemfile"],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Php,
        extensions: &["php"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Kotlin,
        extensions: &["kt", "kts"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Swift,
        extensions: &["swift"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Lua,
        extensions: &["lua"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Yaml,
        extensions: &["yaml", "yml"],
        file_names: &[],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Dockerfile,
        extensions: &["dockerfile"],
        file_names: &["Dockerfile", "Containerfile"],
        has_query: false,
    },
    LanguageProfile {
        lang: Lang::Makefile,
        extensions: &["mk", "make"],
        file_names: &["Makefile", "GNUmakefile", "makefile", "CMakeLists.txt"],
        has_query: false,
    },
];

/// Extensions whose language cannot be decided from the name alone.
const AMBIGUOUS_EXTENSIONS: &[&str] = &["h"];

/// Detect language from the file name and extension.
#[must_use]
pub fn resolve(path: &Path) -> Option<Lang> {
    let file_name = path.file_name()?.to_str()?;

    if let Some(p) = PROFILES.iter().find(|p| p.file_names.contains(&file_name)) {
        return Some(p.lang);
    }

    let lower = file_name.to_ascii_lowercase();
    let mut best: Option<(usize, Lang)> = None;
    for p in PROFILES {
        for ext in p.extensions {
            let matches = lower.len() > ext.len() + 1
                && lower.ends_with(ext)
                && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.';
            if matches && best.is_none_or(|(len, _)| ext.len() > len) {
                best = Some((ext.len(), p.lang));
            }
        }
    }
    best.map(|(_, lang)| lang)
}

/// Like [`resolve`], falling back to a content sniff when the extension is missing
/// or ambiguous.
#[must_use]
pub fn resolve_with_content(path: &Path, content: &str) -> Option<Lang> {
    let by_name = resolve(path);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        None => by_name.or_else(|| sniff_shebang(content)),
        Some(e) if AMBIGUOUS_EXTENSIONS.contains(&e) => {
            if looks_like_cpp(content) {
                Some(Lang::Cpp)
            } else {
                by_name
            }
        }
        Some(_) => by_name,
    }
}

fn sniff_shebang(content: &str) -> Option<Lang> {
    let first = content.lines().next()?;
    let rest = first.strip_prefix("#!")?;
    let mut parts = rest.split_whitespace();
    let mut interpreter = parts.next()?.rsplit('/').next()?;
    if interpreter == "env" {
        interpreter = parts.find(|p| !p.starts_with('-'))?;
    }
    let interpreter = interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    match interpreter {
        "python" => Some(Lang::Python),
        "bash" | "sh" | "zsh" | "dash" | "ksh" => Some(Lang::Bash),
        "node" | "nodejs" => Some(Lang::JavaScript),
        "deno" | "ts-node" => Some(Lang::TypeScript),
        "ruby" => Some(Lang::Ruby),
        "php" => Some(Lang::Php),
        "lua" => Some(Lang::Lua),
        _ => None,
    }
}

fn looks_like_cpp(content: &str) -> bool {
    const MARKERS: &[&str] = &[
        "namespace ",
        "template<",
        "template <",
        "class ",
        "public:",
        "private:",
        "std::",
        "#include <iostream>",
        "#include <vector>",
        "#include <string>",
    ];
    content
        .lines()
        .take(200)
        .any(|line| MARKERS.iter().any(|m| line.trim_start().contains(m)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rs() {
        assert_eq!(resolve(Path::new("src/main.rs")), Some(Lang::Rust));
    }

    #[test]
    fn resolve_js_variants() {
        for ext in &["js", "jsx", "mjs", "cjs"] {
            let path = format!("file.{ext}");
            assert_eq!(
                resolve(Path::new(&path)),
                Some(Lang::JavaScript),
                "failed for .{ext}"
            );
        }
    }

    #[test]
    fn resolve_longest_suffix_wins() {
        assert_eq!(resolve(Path::new("types/index.d.ts")), Some(Lang::TypeScript));
        assert_eq!(resolve(Path::new("App.tsx")), Some(Lang::Tsx));
    }

    #[test]
    fn resolve_is_case_insensitive_for_extensions() {
        assert_eq!(resolve(Path::new("MAIN.PY")), Some(Lang::Python));
    }

    #[test]
    fn resolve_special_file_names() {
        assert_eq!(resolve(Path::new("docker/Dockerfile")), Some(Lang::Dockerfile));
        assert_eq!(resolve(Path::new("Makefile")), Some(Lang::Makefile));
        assert_eq!(resolve(Path::new("CMakeLists.txt")), Some(Lang::Makefile));
    }

    #[test]
    fn resolve_unknown_returns_none() {
        assert_eq!(resolve(Path::new("file.xyz")), None);
        assert_eq!(resolve(Path::new("file")), None);
        assert_eq!(resolve(Path::new(".rs")), None);
    }

    #[test]
    fn resolve_is_deterministic() {
        let p = Path::new("a/b/c.hpp");
        assert_eq!(resolve(p), resolve(p));
    }

    #[test]
    fn shebang_sniffing() {
        let p = Path::new("bin/tool");
        assert_eq!(
            resolve_with_content(p, "#!/usr/bin/env python3\nprint(1)\n"),
            Some(Lang::Python)
        );
        assert_eq!(resolve_with_content(p, "#!/bin/bash\necho hi\n"), Some(Lang::Bash));
        assert_eq!(
            resolve_with_content(p, "#!/usr/bin/env -S node --harmony\n"),
            Some(Lang::JavaScript)
        );
        assert_eq!(resolve_with_content(p, "no shebang here\n"), None);
    }

    #[test]
    fn sniffing_skipped_when_extension_is_known() {
        let p = Path::new("script.rs");
        assert_eq!(resolve_with_content(p, "#!/bin/bash\n"), Some(Lang::Rust));
    }

    #[test]
    fn header_sniffing() {
        let p = Path::new("include/widget.h");
        assert_eq!(resolve_with_content(p, "int add(int a, int b);\n"), Some(Lang::C));
        assert_eq!(
            resolve_with_content(p, "namespace ui {\nclass Widget {};\n}\n"),
            Some(Lang::Cpp)
        );
    }

    #[test]
    fn every_lang_has_one_profile() {
        for lang in Lang::ALL {
            assert_eq!(
                PROFILES.iter().filter(|p| p.lang == lang).count(),
                1,
                "{lang}"
            );
        }
    }

    #[test]
    fn lang_id_roundtrip() {
        for lang in Lang::ALL {
            assert_eq!(Lang::from_id(lang.id()), Some(lang));
            assert_eq!(lang.to_string(), lang.id());
        }
        assert_eq!("RUST".parse::<Lang>(), Ok(Lang::Rust));
        assert!("cobol".parse::<Lang>().is_err());
    }

    #[test]
    fn grammar_returns_some_for_enabled_features() {
        #[cfg(feature = "lang-rust")]
        assert!(Lang::Rust.grammar().is_some());
        #[cfg(feature = "lang-python")]
        assert!(Lang::Python.grammar().is_some());
        #[cfg(feature = "lang-js")]
        {
            assert!(Lang::JavaScript.grammar().is_some());
            assert!(Lang::TypeScript.grammar().is_some());
            assert!(Lang::Tsx.grammar().is_some());
        }
        #[cfg(feature = "lang-config")]
        {
            assert!(Lang::Toml.grammar().is_some());
            assert!(Lang::Markdown.grammar().is_some());
        }
    }

    #[test]
    fn grammarless_languages_have_no_grammar() {
        for lang in [Lang::CSharp, Lang::Ruby, Lang::Yaml, Lang::Dockerfile] {
            assert!(!lang.has_grammar(), "{lang}");
            assert!(lang.alternate_grammar().is_none());
        }
    }

    #[test]
    fn config_languages_have_declaration_kinds() {
        assert!(Lang::Toml.declaration_kinds().contains(&"table"));
        assert!(Lang::Markdown.declaration_kinds().contains(&"section"));
        assert!(Lang::Yaml.declaration_kinds().is_empty());
    }
}
