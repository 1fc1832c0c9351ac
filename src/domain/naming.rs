//! Casing helpers used to derive conventional view names.

/// Lowercases only the first character of `value`.
pub fn lower_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Uppercases only the first character of `value`.
pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts a camelCase or PascalCase identifier into snake_case.
///
/// An underscore is inserted before every uppercase letter except the first
/// character and letters already preceded by an underscore.
pub fn to_underline(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 4);
    let mut previous: Option<char> = None;

    for ch in value.chars() {
        if ch.is_uppercase() {
            if previous.is_some_and(|p| p != '_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
        previous = Some(ch);
    }

    result
}

/// Converts a snake_case or kebab-case segment into PascalCase.
pub fn to_pascal(value: &str) -> String {
    value
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(upper_first)
        .collect()
}
