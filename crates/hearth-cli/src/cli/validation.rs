/// Parse a `KEY=VALUE` pair for `--define`.
///
/// The value is inserted verbatim, so string literals need their own quotes:
/// `--define API_URL="'https://example.test'"`.
///
/// # Errors
///
/// Returns an error message if there is no `=` or the key is empty.
pub fn parse_define(s: &str) -> Result<(String, String), String> {
    let Some((key, value)) = s.split_once('=') else {
        return Err(format!("Define must be KEY=VALUE: '{}'", s));
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Define key cannot be empty: '{}'", s));
    }

    if key
        .chars()
        .any(|c| !c.is_alphanumeric() && c != '_' && c != '$' && c != '.')
    {
        return Err(format!(
            "Define key can only contain letters, numbers, '_', '$' or '.': '{}'",
            key
        ));
    }

    Ok((key.to_string(), value.to_string()))
}
