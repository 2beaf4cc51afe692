use crate::types::Listing;

/// Render one listing as the six-line notification body. No escaping here;
/// the gateway client escapes and encodes the message for transport.
pub fn format_listing(listing: &Listing) -> String {
    let seller = listing.seller_username.as_deref().unwrap_or("unknown");
    format!(
        "Name: {}\nPrice: {}\nCondition: {}\nSeller Username: {}\nThumbnail: {}\nItem Link: {}\n",
        listing.name,
        listing.price,
        listing.condition,
        seller,
        listing.thumbnail_url,
        listing.item_url,
    )
}
