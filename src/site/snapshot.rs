use super::models::{Page, SiteContents};
use crate::domain::canonicalize_for_domain;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Rebuilds the persisted contents of a site from a crawl's working set
///
/// Only `Processed` and `Error` pages are kept. Pages on the `www`/non-`www`
/// twin of `domain` are folded into their canonical counterpart when it
/// exists (a missing title is taken from the twin), otherwise they are kept
/// under the canonical URL. Links are remapped through the same folding,
/// self-loops and duplicate edges are dropped, and every link list is sorted.
///
/// Returns the contents and the number of distinct links.
pub fn build_contents(pages: &[Page], domain: &str) -> (SiteContents, usize) {
    let kept: BTreeMap<usize, &Page> = pages
        .iter()
        .filter(|p| p.status.is_persisted())
        .map(|p| (p.id, p))
        .collect();

    // Canonical pages claim their URL first, twins resolve against them
    let mut owner_of_url: HashMap<String, usize> = HashMap::new();
    let mut canonical_urls: HashMap<usize, String> = HashMap::new();
    for page in kept.values() {
        let canonical = canonicalize_for_domain(&page.url, domain);
        if canonical == page.url {
            owner_of_url.insert(canonical.clone(), page.id);
        }
        canonical_urls.insert(page.id, canonical);
    }

    let mut alias: HashMap<usize, usize> = HashMap::new();
    let mut output: BTreeMap<usize, Page> = BTreeMap::new();
    for page in kept.values() {
        let canonical = &canonical_urls[&page.id];
        if *canonical == page.url {
            output.insert(page.id, page.detached());
            alias.insert(page.id, page.id);
        }
    }

    for page in kept.values() {
        let canonical = &canonical_urls[&page.id];
        if *canonical == page.url {
            continue;
        }

        match owner_of_url.get(canonical) {
            Some(&owner) => {
                alias.insert(page.id, owner);
                if let Some(existing) = output.get_mut(&owner) {
                    if existing.title.is_empty() && !page.title.is_empty() {
                        existing.title = page.title.clone();
                    }
                }
            }
            None => {
                let mut moved = page.detached();
                moved.url = canonical.clone();
                owner_of_url.insert(canonical.clone(), page.id);
                alias.insert(page.id, page.id);
                output.insert(page.id, moved);
            }
        }
    }

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for page in kept.values() {
        let source = alias[&page.id];
        for target in &page.links_to {
            if let Some(&target) = alias.get(target) {
                if source != target {
                    pairs.insert((source, target));
                }
            }
        }
    }

    for &(source, target) in &pairs {
        if let Some(page) = output.get_mut(&source) {
            page.links_to.push(target);
        }
    }

    let link_count = pairs.len();
    let contents = SiteContents {
        pages: output.into_values().collect(),
    };
    (contents, link_count)
}
