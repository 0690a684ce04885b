//! Capture-query catalog.
//!
//! Each query tags declaration nodes with a kind capture (`@function`, `@class`, `@impl`,
//! ...) and optionally the declared identifier with `@name`. A `@name` capture attaches to
//! the innermost declaration that encloses it, so it may be written as its own pattern.

use crate::languages::Lang;

const RUST: &str = r"
(function_item name: (identifier) @name) @function
(struct_item name: (type_identifier) @name) @struct
(enum_item name: (type_identifier) @name) @enum
(trait_item name: (type_identifier) @name) @trait
(impl_item type: (_) @name) @impl
(mod_item name: (identifier) @name body: (declaration_list)) @module
";

const PYTHON: &str = r"
(function_definition name: (identifier) @name) @function
(class_definition name: (identifier) @name) @class
";

const JAVASCRIPT: &str = r"
(function_declaration name: (_) @name) @function
(method_definition name: (_) @name) @method
(class_declaration name: (_) @name) @class
(lexical_declaration
  (variable_declarator name: (identifier) @name value: (arrow_function))) @function
";

const TYPESCRIPT: &str = r"
(function_declaration name: (_) @name) @function
(method_definition name: (_) @name) @method
(class_declaration name: (_) @name) @class
(abstract_class_declaration name: (_) @name) @class
(interface_declaration name: (_) @name) @interface
(type_alias_declaration name: (_) @name) @type
(lexical_declaration
  (variable_declarator name: (identifier) @name value: (arrow_function))) @function
";

const GO: &str = r"
(function_declaration name: (identifier) @name) @function
(method_declaration name: (field_identifier) @name) @method
(type_declaration (type_spec name: (type_identifier) @name)) @class
";

const BASH: &str = r"
(function_definition name: (word) @name) @function
";

const JAVA: &str = r"
(class_declaration name: (identifier) @name) @class
(interface_declaration name: (identifier) @name) @interface
(enum_declaration name: (identifier) @name) @enum
(method_declaration name: (identifier) @name) @method
(constructor_declaration name: (identifier) @name) @constructor
";

const C: &str = r"
(function_definition) @function
(function_declarator declarator: (identifier) @name)
(struct_specifier name: (type_identifier) @name body: (field_declaration_list)) @struct
(enum_specifier name: (type_identifier) @name body: (enumerator_list)) @enum
";

const CPP: &str = r"
(function_definition) @function
(function_declarator declarator: (_) @name)
(struct_specifier name: (type_identifier) @name body: (field_declaration_list)) @struct
(class_specifier name: (type_identifier) @name body: (field_declaration_list)) @class
";

/// Query text for `lang`, or `None` when the language relies on generic extraction.
#[must_use]
pub fn query_for(lang: Lang) -> Option<&'static str> {
    match lang {
        Lang::Rust => Some(RUST),
        Lang::Python => Some(PYTHON),
        Lang::JavaScript => Some(JAVASCRIPT),
        Lang::TypeScript | Lang::Tsx => Some(TYPESCRIPT),
        Lang::Go => Some(GO),
        Lang::Bash => Some(BASH),
        Lang::Java => Some(JAVA),
        Lang::C => Some(C),
        Lang::Cpp => Some(CPP),
        _ => None,
    }
}

/// Capture name that carries a declaration's identifier rather than a block.
pub const NAME_CAPTURE: &str = "name";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::PROFILES;

    #[test]
    fn catalog_agrees_with_profiles() {
        for p in PROFILES {
            assert_eq!(query_for(p.lang).is_some(), p.has_query, "{}", p.lang);
        }
    }

    #[test]
    fn every_query_uses_name_capture() {
        for p in PROFILES.iter().filter(|p| p.has_query) {
            let q = query_for(p.lang).unwrap();
            assert!(q.contains("@name"), "{}", p.lang);
        }
    }

    #[test]
    fn queries_compile_against_their_grammar() {
        for p in PROFILES.iter().filter(|p| p.has_query) {
            let Some(grammar) = p.lang.grammar() else {
                continue;
            };
            let q = query_for(p.lang).unwrap();
            let query = tree_sitter::Query::new(&grammar, q);
            assert!(query.is_ok(), "{}: {:?}", p.lang, query.err());
        }
    }
}
