use super::models::Page;
use crate::state::PageStatus;
use std::collections::HashMap;

/// In-memory page store of one crawl session
///
/// Pages are indexed by id (their position in discovery order) and by URL.
/// Ids are dense and never reused.
#[derive(Debug, Default)]
pub struct PageGraph {
    pages: Vec<Page>,
    by_url: HashMap<String, usize>,
}

impl PageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the page for `url`, creating it if needed
    ///
    /// A created page is `Unprocessed` at the given distance. An existing
    /// page is returned as-is.
    pub fn add_page(&mut self, url: &str, distance_from_root: u32) -> usize {
        if let Some(&id) = self.by_url.get(url) {
            return id;
        }

        let id = self.pages.len();
        self.pages.push(Page::new(id, url, distance_from_root));
        self.by_url.insert(url.to_string(), id);
        id
    }

    pub fn id_of(&self, url: &str) -> Option<usize> {
        self.by_url.get(url).copied()
    }

    pub fn get(&self, id: usize) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Page> {
        self.pages.get_mut(id)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Records the links found on page `from`
    ///
    /// New targets are created one step further from the root than `from`.
    /// Targets still waiting in the frontier get their distance lowered when
    /// `from` offers a shorter path; pages already dispatched keep theirs.
    /// Self-links and repeated edges are ignored.
    pub fn add_links<I, S>(&mut self, from: usize, links: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(parent) = self.pages.get(from) else {
            return;
        };
        let next_distance = parent.distance_from_root.saturating_add(1);

        for link in links {
            let target = match self.id_of(link.as_ref()) {
                Some(id) => {
                    let page = &mut self.pages[id];
                    if page.status == PageStatus::Unprocessed
                        && page.distance_from_root > next_distance
                    {
                        page.distance_from_root = next_distance;
                    }
                    id
                }
                None => self.add_page(link.as_ref(), next_distance),
            };

            if target == from {
                continue;
            }

            let edges = &mut self.pages[from].links_to;
            if !edges.contains(&target) {
                edges.push(target);
            }
        }
    }

    /// Up to `limit` frontier pages, nearest to the root first
    pub fn frontier(&self, limit: usize) -> Vec<usize> {
        let mut candidates: Vec<&Page> = self
            .pages
            .iter()
            .filter(|p| p.status == PageStatus::Unprocessed)
            .collect();
        candidates.sort_by_key(|p| (p.distance_from_root, p.id));
        candidates.into_iter().take(limit).map(|p| p.id).collect()
    }

    pub fn count_with_status(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}
