//! Identifier casing for project names.
//!
//! Generated files need the same name in several shapes: a crate or module
//! name, a package name, a type name. These helpers derive each of them from
//! whatever the user typed on the command line.

/// `"MyApp"` → `"my_app"`, `"XMLHttpRequest"` → `"xml_http_request"`.
pub fn snake_case(s: &str) -> String {
    words(s).join("_")
}

/// `"MyApp"` → `"my-app"`. Used for package and directory names.
pub fn kebab_case(s: &str) -> String {
    words(s).join("-")
}

/// `"my-app"` → `"MyApp"`, `"HTTPRequest"` → `"HttpRequest"`.
pub fn pascal_case(s: &str) -> String {
    words(s)
        .into_iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Lowercased words of `input`.
///
/// Boundaries:
/// 1. `_`, `-`, `.` and whitespace always split.
/// 2. `aB` splits between `a` and `B`.
/// 3. `ABc` splits between `A` and `Bc` (acronym followed by a word).
fn words(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    let flush = |current: &mut String, out: &mut Vec<String>| {
        if !current.is_empty() {
            out.push(current.to_lowercase());
            current.clear();
        }
    };

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            flush(&mut current, &mut out);
            continue;
        }

        current.push(c);

        if let Some(&next) = chars.peek() {
            let lower_to_upper = (c.is_lowercase() || c.is_ascii_digit()) && next.is_uppercase();
            let acronym_end = c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase());
            if lower_to_upper || acronym_end {
                flush(&mut current, &mut out);
            }
        }
    }
    flush(&mut current, &mut out);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_handles_mixed_input() {
        assert_eq!(snake_case("MyApp"), "my_app");
        assert_eq!(snake_case("my-app"), "my_app");
        assert_eq!(snake_case("my awesome project"), "my_awesome_project");
        assert_eq!(snake_case("XMLHttpRequest"), "xml_http_request");
    }

    #[test]
    fn kebab_handles_acronyms() {
        assert_eq!(kebab_case("HTTPServer"), "http-server");
        assert_eq!(kebab_case("my_app"), "my-app");
    }

    #[test]
    fn pascal_capitalizes_each_word() {
        assert_eq!(pascal_case("my-app"), "MyApp");
        assert_eq!(pascal_case("HTTPRequest"), "HttpRequest");
        assert_eq!(pascal_case(""), "");
    }

    #[test]
    fn digits_stay_attached() {
        assert_eq!(snake_case("web3App"), "web3_app");
        assert_eq!(kebab_case("v2"), "v2");
    }
}
