// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub listing_id: u64,
    pub name: String,
    pub price: String,
    pub condition: String,
    pub thumbnail_url: String,
    /// None when the listing-detail map had no seller for this id.
    pub seller_username: Option<String>,
    pub item_url: String,
    /// Creation time in Unix seconds. The only recency signal.
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// ListingSet
// ---------------------------------------------------------------------------

/// Eligible listings from one scan of one query term, in snapshot order.
/// Replaced wholesale on every successful scan, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSet {
    listings: Vec<Listing>,
}

impl ListingSet {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// Maximum creation timestamp in the set. None for an empty set.
    pub fn high_water_mark(&self) -> Option<i64> {
        self.listings.iter().map(|l| l.timestamp).max()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Listing> {
        self.listings.iter()
    }
}

impl FromIterator<Listing> for ListingSet {
    fn from_iter<I: IntoIterator<Item = Listing>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ListingSet {
    type Item = &'a Listing;
    type IntoIter = std::slice::Iter<'a, Listing>;

    fn into_iter(self) -> Self::IntoIter {
        self.listings.iter()
    }
}

#[cfg(test)]
pub(crate) fn test_listing(listing_id: u64, timestamp: i64) -> Listing {
    Listing {
        listing_id,
        name: format!("Item {listing_id}"),
        price: "S$10".to_string(),
        condition: "Used".to_string(),
        thumbnail_url: format!("https://media.example.com/{listing_id}.jpg"),
        seller_username: Some("seller".to_string()),
        item_url: format!("https://sg.carousell.com/p/Item-{listing_id}"),
        timestamp,
    }
}
