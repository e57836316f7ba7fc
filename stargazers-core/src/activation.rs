use url::Url;

pub const SEARCH_HOST: &str = "search.nixos.org";
pub const SEARCH_PATH_PREFIX: &str = "/packages";

/// True for `https://search.nixos.org/packages...?...query=...` pages, the
/// only pages whose layout the default selectors describe
pub fn is_search_results_page(url: &Url) -> bool {
    url.host_str() == Some(SEARCH_HOST)
        && url.path().starts_with(SEARCH_PATH_PREFIX)
        && url.query_pairs().any(|(key, _)| key == "query")
}
