use std::sync::OnceLock;

use regex::Regex;

static IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();
static FUNCTION_REGEX: OnceLock<Regex> = OnceLock::new();
static ARROW_REGEX: OnceLock<Regex> = OnceLock::new();
static METHOD_REGEX: OnceLock<Regex> = OnceLock::new();
static ROUTE_CALL_REGEX: OnceLock<Regex> = OnceLock::new();
static SERVICE_CLASS_REGEX: OnceLock<Regex> = OnceLock::new();

const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "constructor",
];

fn import_regex() -> &'static Regex {
    IMPORT_REGEX.get_or_init(|| {
        Regex::new(r#"(?:import\s+(?:[^'";]*?\s+from\s+)?|require\s*\(\s*)['"]([^'"]+)['"]"#)
            .expect("IMPORT_REGEX is valid")
    })
}

fn function_regex() -> &'static Regex {
    FUNCTION_REGEX.get_or_init(|| {
        Regex::new(r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").expect("FUNCTION_REGEX is valid")
    })
}

fn arrow_regex() -> &'static Regex {
    ARROW_REGEX.get_or_init(|| {
        Regex::new(
            r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
        )
        .expect("ARROW_REGEX is valid")
    })
}

fn method_regex() -> &'static Regex {
    METHOD_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]+(?:static\s+)?(?:async\s+)?([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*\{")
            .expect("METHOD_REGEX is valid")
    })
}

fn route_call_regex() -> &'static Regex {
    ROUTE_CALL_REGEX.get_or_init(|| {
        Regex::new(r"\b(?:router|app|server|fastify)\.(?:get|post|put|patch|delete|all|route)\s*\(")
            .expect("ROUTE_CALL_REGEX is valid")
    })
}

fn service_class_regex() -> &'static Regex {
    SERVICE_CLASS_REGEX.get_or_init(|| {
        Regex::new(r"\bclass\s+[A-Za-z_$][\w$]*Service\b").expect("SERVICE_CLASS_REGEX is valid")
    })
}

/// Module specifiers from `import` statements and `require()` calls.
pub fn imports(source: &str) -> Vec<String> {
    dedup(
        import_regex()
            .captures_iter(source)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string())),
    )
}

/// Declared function, arrow-function and method names, first occurrence order.
pub fn functions(source: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for re in [function_regex(), arrow_regex(), method_regex()] {
        for caps in re.captures_iter(source) {
            if let Some(m) = caps.get(1) {
                if !NOT_METHODS.contains(&m.as_str()) {
                    found.push((m.start(), m.as_str().to_string()));
                }
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    dedup(found.into_iter().map(|(_, name)| name))
}

pub fn has_route_calls(source: &str) -> bool {
    route_call_regex().is_match(source)
}

pub fn has_service_class(source: &str) -> bool {
    service_class_regex().is_match(source)
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_cover_esm_and_commonjs() {
        let src = r#"
import express from 'express';
import { a, b } from "./lib/a";
import './side-effect';
const redis = require('redis');
const again = require("redis");
"#;
        assert_eq!(
            imports(src),
            vec!["express", "./lib/a", "./side-effect", "redis"]
        );
    }

    #[test]
    fn test_functions_in_source_order() {
        let src = r#"
const list = async (req, res) => {};
function create(req, res) {
  if (req.body) {
    return res.json({});
  }
}
class Repo {
  async findById(id) {
    return null;
  }
}
"#;
        assert_eq!(functions(src), vec!["list", "create", "findById"]);
    }

    #[test]
    fn test_route_and_service_detection() {
        assert!(has_route_calls("router.get('/users', h)"));
        assert!(has_route_calls("app.post ('/x', h)"));
        assert!(!has_route_calls("cache.get('k')"));
        assert!(has_service_class("export class OrderService {"));
        assert!(!has_service_class("class ServiceLocator {}"));
    }
}
