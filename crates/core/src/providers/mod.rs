pub mod registry;
pub mod traits;

// API provider implementations
pub mod exchangerate_host;
pub mod frankfurter;

/// Uppercased, de-duplicated `wanted` codes, without `base`.
pub(crate) fn quote_codes(base: &str, wanted: &[String]) -> Vec<String> {
    let base = base.to_uppercase();
    let mut codes: Vec<String> = Vec::new();
    for code in wanted {
        let code = code.trim().to_uppercase();
        if !code.is_empty() && code != base && !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}
