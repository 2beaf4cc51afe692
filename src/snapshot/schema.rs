use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::BUMP_COMPONENTS;
use crate::error::SchemaError;
use crate::types::{Listing, ListingSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub cards_total: usize,
    pub accepted: usize,
    pub rejected_no_id: usize,
    pub rejected_zero_id: usize,
    pub rejected_promoted: usize,
    pub rejected_bumped: usize,
    pub rejected_malformed: usize,
    pub rejected_duplicate: usize,
}

impl ExtractStats {
    pub fn rejected(&self) -> usize {
        self.cards_total - self.accepted
    }
}

/// Validated view over a raw snapshot document: the listing-card array and
/// the listing-detail map used to resolve sellers.
#[derive(Debug)]
pub struct Snapshot<'a> {
    cards: &'a [Value],
    listings_map: &'a Map<String, Value>,
}

impl<'a> Snapshot<'a> {
    /// Check the top-level shape. A failure here aborts the scan of this
    /// query term only.
    pub fn from_document(doc: &'a Value) -> Result<Self, SchemaError> {
        let cards = doc
            .get("SearchListing")
            .ok_or(SchemaError::MissingField("SearchListing"))?
            .get("listingCards")
            .ok_or(SchemaError::MissingField("SearchListing.listingCards"))?
            .as_array()
            .ok_or(SchemaError::WrongType("SearchListing.listingCards"))?;

        let listings_map = doc
            .get("Listing")
            .ok_or(SchemaError::MissingField("Listing"))?
            .get("listingsMap")
            .ok_or(SchemaError::MissingField("Listing.listingsMap"))?
            .as_object()
            .ok_or(SchemaError::WrongType("Listing.listingsMap"))?;

        Ok(Self { cards, listings_map })
    }

    pub fn cards(&self) -> &'a [Value] {
        self.cards
    }

    /// Resolve the seller handle for a listing via the detail map.
    pub fn seller_username(&self, listing_id: u64) -> Option<&'a str> {
        self.listings_map
            .get(&listing_id.to_string())?
            .get("seller")?
            .get("username")?
            .as_str()
    }
}

enum Rejection {
    NoId,
    ZeroId,
    Promoted,
    Bumped,
    Malformed(&'static str),
}

/// Run the adapter and the eligibility filter over a snapshot, producing the
/// eligible listings in snapshot order.
pub fn extract_listings(
    doc: &Value,
    marketplace_url: &str,
) -> Result<(ListingSet, ExtractStats), SchemaError> {
    let snapshot = Snapshot::from_document(doc)?;

    let mut stats = ExtractStats {
        cards_total: snapshot.cards().len(),
        ..Default::default()
    };
    let mut seen: HashSet<u64> = HashSet::new();
    let mut listings = Vec::new();

    for card in snapshot.cards() {
        match parse_card_checked(card, &snapshot, marketplace_url) {
            Ok(listing) => {
                if !seen.insert(listing.listing_id) {
                    stats.rejected_duplicate += 1;
                    continue;
                }
                listings.push(listing);
            }
            Err(rejection) => match rejection {
                Rejection::NoId => stats.rejected_no_id += 1,
                Rejection::ZeroId => stats.rejected_zero_id += 1,
                Rejection::Promoted => stats.rejected_promoted += 1,
                Rejection::Bumped => stats.rejected_bumped += 1,
                Rejection::Malformed(field) => {
                    debug!(field, "skipping eligible card with malformed field");
                    stats.rejected_malformed += 1;
                }
            },
        }
    }

    stats.accepted = listings.len();
    Ok((ListingSet::new(listings), stats))
}

fn parse_card_checked(
    card: &Value,
    snapshot: &Snapshot<'_>,
    marketplace_url: &str,
) -> std::result::Result<Listing, Rejection> {
    let listing_id = match card.get("listingID") {
        None | Some(Value::Null) => return Err(Rejection::NoId),
        Some(v) => as_u64_lenient(v).ok_or(Rejection::Malformed("listingID"))?,
    };
    if listing_id == 0 {
        return Err(Rejection::ZeroId);
    }
    if is_promoted(card) {
        return Err(Rejection::Promoted);
    }

    let top = card
        .get("aboveFold")
        .and_then(|a| a.as_array())
        .and_then(|a| a.first());
    let component = top.and_then(|c| c.get("component")).and_then(|c| c.as_str());
    if component.is_some_and(|c| BUMP_COMPONENTS.contains(&c)) {
        return Err(Rejection::Bumped);
    }

    let timestamp = top
        .and_then(|c| c.get("timestampContent"))
        .and_then(|t| t.get("seconds"))
        .and_then(|s| s.as_i64().or_else(|| s.get("low").and_then(|l| l.as_i64())))
        .ok_or(Rejection::Malformed("aboveFold[0].timestampContent.seconds"))?;

    let below = card.get("belowFold").and_then(|b| b.as_array());
    let below_text = |idx: usize| {
        below
            .and_then(|b| b.get(idx))
            .and_then(|f| f.get("stringContent"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string())
    };
    let name = below_text(0).ok_or(Rejection::Malformed("belowFold[0].stringContent"))?;
    let price = below_text(1).ok_or(Rejection::Malformed("belowFold[1].stringContent"))?;
    let condition = below_text(2).ok_or(Rejection::Malformed("belowFold[2].stringContent"))?;

    let thumbnail_url = card
        .get("thumbnailURL")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string();

    let item_url = item_url(marketplace_url, &name, listing_id);

    Ok(Listing {
        listing_id,
        seller_username: snapshot.seller_username(listing_id).map(|s| s.to_string()),
        name,
        price,
        condition,
        thumbnail_url,
        item_url,
        timestamp,
    })
}

/// A card carrying a `promoted` key is paid placement, whatever the value.
fn is_promoted(card: &Value) -> bool {
    card.get("promoted").is_some()
}

/// Listing ids arrive as integers, occasionally as numeric strings.
fn as_u64_lenient(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Strip every character that is not an ASCII letter or a space, then join
/// the remaining words with hyphens.
/// `Nike Air 90 (Red)` → `Nike-Air-Red`.
pub fn listing_slug(name: &str) -> String {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();
    letters.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Canonical item link: `<marketplace>/p/<slug>-<listing_id>`.
pub fn item_url(marketplace_url: &str, name: &str, listing_id: u64) -> String {
    let slug = listing_slug(name);
    if slug.is_empty() {
        format!("{marketplace_url}/p/{listing_id}")
    } else {
        format!("{marketplace_url}/p/{slug}-{listing_id}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
