//! Identifier helpers shared by the model compiler and the route resolver.

use http::Method;

/// Convert an arbitrary string to CamelCase
///
/// Every run of non-alphanumeric characters starts a new word; the first
/// letter of each word is upper-cased and the rest is kept as written.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(to_camel_case("user_profile"), "UserProfile");
/// assert_eq!(to_camel_case("getPetById"), "GetPetById");
/// assert_eq!(to_camel_case("post /company/{id}"), "PostCompanyId");
/// ```
pub fn to_camel_case(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert a string to snake_case
///
/// An upper-case letter starts a new word after a lower-case letter or digit.
/// A run of upper-case letters stays one word, except that its last letter
/// starts the next word when followed by a lower-case one (`HTTPServer` becomes
/// `http_server`). Any other separator collapses to a single underscore.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else if ch.is_lowercase() || ch.is_ascii_digit() {
            result.push(ch);
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }

    result.trim_end_matches('_').to_string()
}

/// Route name used when no `RouteInfo` supplies one
///
/// `POST /company/basic-info` becomes `post_company_basic_info` and a path
/// parameter segment `{id}` becomes `by_id`.
pub fn default_route_name(method: &Method, path: &str) -> String {
    let mut parts = vec![method.as_str().to_ascii_lowercase()];
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let word = match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(param) => format!("by_{}", to_snake_case(param)),
            None => to_snake_case(segment),
        };
        if !word.is_empty() {
            parts.push(word);
        }
    }
    parts.join("_")
}

/// CamelCase name of an operation, used as the stem of inline model names
///
/// The `operationId` wins when present, otherwise method and path are combined.
pub fn operation_stem(operation_id: Option<&str>, method: &Method, path: &str) -> String {
    match operation_id.map(to_camel_case).filter(|s| !s.is_empty()) {
        Some(stem) => stem,
        None => to_camel_case(&format!("{} {path}", method.as_str().to_ascii_lowercase())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("user_profile"), "UserProfile");
        assert_eq!(to_camel_case("getPetById"), "GetPetById");
        assert_eq!(to_camel_case("Basic Company Info"), "BasicCompanyInfo");
        assert_eq!(to_camel_case("post /company/{id}"), "PostCompanyId");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("petId"), "pet_id");
        assert_eq!(to_snake_case("basic-info"), "basic_info");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Trailing-"), "trailing");
        assert_eq!(to_snake_case("BasicInfo"), "basic_info");
    }

    #[test]
    fn test_snake_case_keeps_acronyms_together() {
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("petID"), "pet_id");
        assert_eq!(to_snake_case("getHTTPResponseCode"), "get_http_response_code");
        assert_eq!(to_snake_case("API"), "api");
        assert_eq!(to_snake_case("v2APIKey"), "v2_api_key");
    }

    #[test]
    fn test_default_route_name() {
        assert_eq!(
            default_route_name(&Method::POST, "/company/basic-info"),
            "post_company_basic_info"
        );
        assert_eq!(default_route_name(&Method::GET, "/pets/{petId}"), "get_pets_by_pet_id");
        assert_eq!(default_route_name(&Method::GET, "/"), "get");
        assert_eq!(default_route_name(&Method::GET, "/HTTPServer/{serverID}"), "get_http_server_by_server_id");
    }

    #[test]
    fn test_operation_stem() {
        assert_eq!(operation_stem(Some("listPets"), &Method::GET, "/pets"), "ListPets");
        assert_eq!(operation_stem(None, &Method::POST, "/pets/{id}"), "PostPetsId");
    }
}
