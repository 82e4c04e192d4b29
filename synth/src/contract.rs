//! Calling-convention checks run on the rendered text.
//!
//! The declaration, the definition and any call site must all agree with
//! [`param_list`]: same parameter types, same order, and the split-k
//! parameter present in all of them or in none.

use core_types::OperationDescriptor;

use crate::params::param_list;
use crate::types::SynthError;

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Collapse whitespace and glue pointer stars to their type
fn normalize(param: &str) -> String {
    param.split_whitespace().collect::<Vec<_>>().join(" ").replace(" *", "*")
}

/// How a signature must continue after its parameter list
#[derive(Clone, Copy)]
enum Follows {
    /// `;`, a prototype
    Semicolon,
    /// `{`, the function body
    Body,
}

/// Text between `void <function>(` and the closing `)`, for the first
/// signature followed by `follows`. Other mentions of the function, such
/// as a prototype ahead of the definition, are skipped.
fn signature_body<'a>(text: &'a str, function: &str, follows: Follows) -> Option<&'a str> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(function) {
        let start = from + rel;
        let end = start + function.len();
        from = end;

        let head = &text[..start];
        if !head.ends_with(char::is_whitespace) {
            continue;
        }
        let Some(before_void) = head.trim_end().strip_suffix("void") else { continue };
        if before_void.ends_with(is_ident_char) {
            continue;
        }
        let Some(args) = text[end..].trim_start().strip_prefix('(') else { continue };
        let Some(close) = args.find(')') else { continue };
        let rest = args[close + 1..].trim_start();
        let terminated = match follows {
            Follows::Semicolon => rest.starts_with(';'),
            Follows::Body => rest.starts_with('{'),
        };
        if terminated {
            return Some(&args[..close]);
        }
    }
    None
}

fn split_params(body: &str) -> Vec<String> {
    body.split(',').map(normalize).filter(|p| !p.is_empty()).collect()
}

/// Parameter types of the declaration of `function`
pub fn declaration_params(text: &str, function: &str) -> Result<Vec<String>, String> {
    signature_body(text, function, Follows::Semicolon)
        .map(split_params)
        .ok_or_else(|| format!("no declaration of `{function}` found"))
}

/// `(type, name)` pairs of the definition of `function`
pub fn definition_params(text: &str, function: &str) -> Result<Vec<(String, String)>, String> {
    let body = signature_body(text, function, Follows::Body)
        .ok_or_else(|| format!("no definition of `{function}` found"))?;
    split_params(body)
        .into_iter()
        .map(|p| {
            let name_start = p.rfind(|c: char| !is_ident_char(c)).map(|i| i + 1);
            match name_start {
                Some(i) if i < p.len() && !p[i..].starts_with(|c: char| c.is_ascii_digit()) => {
                    Ok((p[..i].trim_end().to_string(), p[i..].to_string()))
                }
                _ => Err(format!("definition parameter `{p}` has no name")),
            }
        })
        .collect()
}

/// Drop the names, keeping the types in order
pub fn strip_names(params: &[(String, String)]) -> Vec<String> {
    params.iter().map(|(ty, _)| ty.clone()).collect()
}

/// Check a declaration/definition pair against the descriptor's convention
pub fn verify(
    desc: &OperationDescriptor,
    declaration: &str,
    definition: &str,
) -> Result<(), SynthError> {
    let function = &desc.function_name;
    let violation = |detail: String| SynthError::ContractViolation {
        function: function.clone(),
        detail,
    };

    let decl = declaration_params(declaration, function).map_err(violation)?;
    let def = definition_params(definition, function).map_err(violation)?;

    let stripped = strip_names(&def);
    if stripped != decl {
        return Err(violation(format!(
            "definition types {stripped:?} differ from declaration types {decl:?}"
        )));
    }

    let expected = param_list(desc);
    let expected_types: Vec<&str> = expected.iter().map(|p| p.ty.as_str()).collect();
    if decl != expected_types {
        return Err(violation(format!(
            "declaration types {decl:?} differ from the expected {expected_types:?}"
        )));
    }

    let names: Vec<&str> = def.iter().map(|(_, n)| n.as_str()).collect();
    let expected_names: Vec<&str> = expected.iter().map(|p| p.name.as_str()).collect();
    if names != expected_names {
        return Err(violation(format!(
            "definition names {names:?} differ from the expected {expected_names:?}"
        )));
    }
    Ok(())
}

/// Top-level arguments of the first call to `function` in `text`
pub fn call_arguments(text: &str, function: &str) -> Result<Vec<String>, String> {
    let start = text
        .match_indices(function)
        .map(|(i, _)| i)
        .find(|&i| {
            !text[..i].ends_with(is_ident_char)
                && text[i + function.len()..].trim_start().starts_with('(')
        })
        .ok_or_else(|| format!("no call to `{function}` found"))?;
    let open = start + function.len() + text[start + function.len()..].find('(').unwrap_or(0);

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text[open + 1..].chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => {
                let last = normalize(&current);
                if !last.is_empty() {
                    args.push(last);
                }
                return Ok(args);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(normalize(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    Err(format!("call to `{function}` is not closed"))
}

/// Check a rendered call site passes one argument per parameter
pub fn verify_call(desc: &OperationDescriptor, call: &str) -> Result<(), SynthError> {
    let function = &desc.function_name;
    let violation = |detail: String| SynthError::ContractViolation {
        function: function.clone(),
        detail,
    };
    let args = call_arguments(call, function).map_err(violation)?;
    let expected = param_list(desc).len();
    if args.len() != expected {
        return Err(violation(format!(
            "call passes {} arguments, the declaration takes {expected}",
            args.len()
        )));
    }
    Ok(())
}
