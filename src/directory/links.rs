//! Resource links handed to view glue for an entry.

use super::types::Entry;

/// Detail page URL for an entry.
pub fn url_for_entry(entry: &Entry) -> String {
  format!("./restaurant.html?id={}", entry.id)
}

/// Default image URL for an entry.
pub fn image_url_for_entry(entry: &Entry) -> String {
  format!("/img/{}.jpg", image_stem(entry))
}

/// Width-specific image URLs, e.g. `/img/1-250px.jpg`.
///
/// Every variant canonicalizes to the same image cache slot.
pub fn responsive_image_urls(entry: &Entry, widths: &[u32]) -> Vec<(u32, String)> {
  let stem = image_stem(entry);
  widths
    .iter()
    .map(|width| (*width, format!("/img/{}-{}px.jpg", stem, width)))
    .collect()
}

fn image_stem(entry: &Entry) -> String {
  entry
    .photograph
    .as_deref()
    .map(|p| p.trim_end_matches(".jpg").to_string())
    .unwrap_or_else(|| entry.id.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::directory::types::Location;

  fn entry(id: i64, photograph: Option<&str>) -> Entry {
    Entry {
      id,
      name: "Katz's Delicatessen".to_string(),
      category: "American".to_string(),
      region: "Manhattan".to_string(),
      location: Location { lat: 0.0, lng: 0.0 },
      address: String::new(),
      hours: None,
      reviews: None,
      photograph: photograph.map(String::from),
    }
  }

  #[test]
  fn test_detail_url() {
    assert_eq!(url_for_entry(&entry(4, None)), "./restaurant.html?id=4");
  }

  #[test]
  fn test_image_url_prefers_photograph() {
    assert_eq!(image_url_for_entry(&entry(4, None)), "/img/4.jpg");
    assert_eq!(image_url_for_entry(&entry(4, Some("katz.jpg"))), "/img/katz.jpg");
  }

  #[test]
  fn test_responsive_urls() {
    let urls = responsive_image_urls(&entry(10, None), &[250, 800]);
    assert_eq!(
      urls,
      vec![
        (250, "/img/10-250px.jpg".to_string()),
        (800, "/img/10-800px.jpg".to_string())
      ]
    );
  }
}
