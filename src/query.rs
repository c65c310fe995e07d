use url::form_urlencoded;

/// Appends `params` to `url` as a form-urlencoded query string.
///
/// Parameters keep their order. An empty slice returns the URL unchanged;
/// a URL that already has a `?` gets the new pairs after a `&`.
pub fn add_query_parameters(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}
