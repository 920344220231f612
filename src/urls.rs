/// Percent-encodes a value the way browsers' `encodeURIComponent` does for
/// spaces (`%20`, never `+`), so it is safe in paths, queries and `mailto:` bodies.
pub fn encode_component(value: &str) -> String {
    // byte_serialize escapes a literal '+' as %2B, so every '+' left is a space.
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
