use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Expression, ObjectExpression, ObjectPropertyKind, PropertyKey, Statement,
    VariableDeclaration, VariableDeclarationKind,
};
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;
use sieve_error::{Error, Result};

/// Parses `source` as a script, deletes the named top-level `var`
/// bindings (or nested object-literal properties) described by `keys`,
/// and re-serializes. Only `var` declarations are touched — `let` and
/// `const` are left alone, a deliberately conservative scope matching
/// the legacy globals this transform targets.
///
/// Returns the rewritten source alongside whether anything was actually
/// removed, since the codegen pass reformats `source` even when no key
/// matched.
pub fn strip_keys(source: &str, keys: &[Vec<String>]) -> Result<(String, bool)> {
    let allocator = Allocator::default();
    let source_type = SourceType::default();
    let parsed = Parser::new(&allocator, source, source_type).parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown parse error".to_owned());
        return Err(Error::ParseFailed {
            what: "javascript",
            message,
        });
    }

    let mut program = parsed.program;
    let mut removed = false;
    for key in keys {
        if key.is_empty() {
            continue;
        }
        prune_top_level(&mut program.body, key, &mut removed);
    }

    Ok((Codegen::new().build(&program).code, removed))
}

fn prune_top_level(body: &mut oxc_allocator::Vec<Statement>, path: &[String], removed: &mut bool) {
    body.retain_mut(|stmt| {
        if let Statement::VariableDeclaration(decl) = stmt {
            if decl.kind == VariableDeclarationKind::Var {
                prune_var_decl(decl, path, removed);
                return !decl.declarations.is_empty();
            }
        }
        true
    });
}

fn prune_var_decl(decl: &mut VariableDeclaration, path: &[String], removed: &mut bool) {
    let (head, rest) = match path.split_first() {
        Some(pair) => pair,
        None => return,
    };

    decl.declarations.retain_mut(|declarator| {
        let name = match binding_name(&declarator.id.kind) {
            Some(name) => name,
            None => return true,
        };
        if name != *head {
            return true;
        }
        if rest.is_empty() {
            *removed = true;
            return false;
        }
        if let Some(Expression::ObjectExpression(obj)) = &mut declarator.init {
            prune_object(obj, rest, removed);
        }
        true
    });
}

fn prune_object(obj: &mut ObjectExpression, path: &[String], removed: &mut bool) {
    let (head, rest) = match path.split_first() {
        Some(pair) => pair,
        None => return,
    };

    obj.properties.retain_mut(|prop| {
        let ObjectPropertyKind::ObjectProperty(property) = prop else {
            return true;
        };
        let name = match property_name(&property.key) {
            Some(name) => name,
            None => return true,
        };
        if name != *head {
            return true;
        }
        if rest.is_empty() {
            log::trace!("removed js constant property {head}");
            *removed = true;
            return false;
        }
        if let Expression::ObjectExpression(nested) = &mut property.value {
            prune_object(nested, rest, removed);
        }
        true
    });
}

fn binding_name(kind: &BindingPatternKind) -> Option<String> {
    match kind {
        BindingPatternKind::BindingIdentifier(id) => Some(id.name.to_string()),
        _ => None,
    }
}

fn property_name(key: &PropertyKey) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        PropertyKey::NumericLiteral(lit) => Some(lit.value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(spec: &[&str]) -> Vec<Vec<String>> {
        vec![spec.iter().map(|s| s.to_string()).collect()]
    }

    #[test]
    fn removes_a_top_level_var_binding() {
        let (out, removed) = strip_keys("var tracking = true;\nvar other = 1;", &keys(&["tracking"])).unwrap();
        assert!(removed);
        assert!(!out.contains("tracking"));
        assert!(out.contains("other"));
    }

    #[test]
    fn removes_a_nested_object_property() {
        let (out, removed) = strip_keys("var cfg = { a: { b: 1, c: 2 } };", &keys(&["cfg", "a", "b"])).unwrap();
        assert!(removed);
        assert!(!out.contains('b'));
        assert!(out.contains('c'));
    }

    #[test]
    fn drops_whole_statement_when_binding_list_becomes_empty() {
        let (out, removed) = strip_keys("var onlyOne = 1;", &keys(&["onlyOne"])).unwrap();
        assert!(removed);
        assert!(!out.contains("onlyOne"));
    }

    #[test]
    fn leaves_let_and_const_untouched() {
        let (out, removed) = strip_keys("let tracking = true; const other = 2;", &keys(&["tracking"])).unwrap();
        assert!(!removed);
        assert!(out.contains("tracking"));
    }

    #[test]
    fn unmatched_key_reports_no_removal() {
        let (out, removed) = strip_keys("var other = 1;", &keys(&["tracking"])).unwrap();
        assert!(!removed);
        assert!(out.contains("other"));
    }
}
