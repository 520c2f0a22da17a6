//! Request de-duplication on a canonical URL fingerprint

use std::collections::HashSet;

use url::Url;

use crate::domain::constants::site;

/// Remembers every request fingerprint seen during one run
#[derive(Debug, Default)]
pub struct DupeFilter {
    seen: HashSet<String>,
}

impl DupeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form: tracking parameter removed, query pairs sorted, no fragment
    pub fn fingerprint(url: &Url) -> String {
        let mut canonical = url.clone();
        canonical.set_fragment(None);

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != site::TRACKING_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        pairs.sort();

        if pairs.is_empty() {
            canonical.set_query(None);
        } else {
            canonical.query_pairs_mut().clear().extend_pairs(pairs);
        }
        canonical.into()
    }

    /// Record a URL, false when an equivalent URL was already seen
    pub fn insert(&mut self, url: &Url) -> bool {
        self.seen.insert(Self::fingerprint(url))
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(&Self::fingerprint(url))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn tracking_parameter_is_ignored() {
        let mut filter = DupeFilter::new();
        assert!(filter.insert(&url("https://store.steampowered.com/app/620/Portal_2/?snr=1_7_7_230_150_1")));
        assert!(!filter.insert(&url("https://store.steampowered.com/app/620/Portal_2/")));
        assert!(!filter.insert(&url("https://store.steampowered.com/app/620/Portal_2/?snr=1_7_7_230_150_2")));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn query_order_and_fragment_do_not_matter() {
        let a = DupeFilter::fingerprint(&url("https://store.steampowered.com/search/?page=2&sort_by=Released_DESC#x"));
        let b = DupeFilter::fingerprint(&url("https://store.steampowered.com/search/?sort_by=Released_DESC&page=2"));
        assert_eq!(a, b);
        assert_eq!(a, "https://store.steampowered.com/search/?page=2&sort_by=Released_DESC");
    }

    #[test]
    fn distinct_pages_stay_distinct() {
        let mut filter = DupeFilter::new();
        assert!(filter.insert(&url("https://store.steampowered.com/search/?page=2")));
        assert!(filter.insert(&url("https://store.steampowered.com/search/?page=3")));
        assert!(filter.contains(&url("https://store.steampowered.com/search/?page=3&snr=1")));
        assert!(!filter.is_empty());
    }
}
