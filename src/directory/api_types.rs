//! Serde-deserializable types matching the restaurant feed.
//!
//! These types are separate from domain types to allow clean deserialization
//! of the feed's field names while keeping domain types focused on application
//! needs.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

use super::types::{Entry, Location, Review};

#[derive(Debug, Deserialize)]
pub struct ApiLatLng {
  pub lat: f64,
  pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct ApiReview {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub date: String,
  #[serde(default)]
  pub rating: i64,
  #[serde(default)]
  pub comments: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiRestaurant {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub cuisine_type: String,
  #[serde(default)]
  pub neighborhood: String,
  pub latlng: ApiLatLng,
  #[serde(default)]
  pub address: String,
  #[serde(default, deserialize_with = "deserialize_ordered_hours")]
  pub operating_hours: Option<Vec<(String, String)>>,
  pub reviews: Option<Vec<ApiReview>>,
  pub photograph: Option<String>,
}

/// Read the weekday -> hours object as pairs, keeping the feed's key order.
fn deserialize_ordered_hours<'de, D>(deserializer: D) -> Result<Option<Vec<(String, String)>>, D::Error>
where
  D: Deserializer<'de>,
{
  struct HoursVisitor;

  impl<'de> Visitor<'de> for HoursVisitor {
    type Value = Option<Vec<(String, String)>>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str("a map of weekday to opening hours")
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
      Ok(None)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
      Ok(None)
    }

    fn visit_some<D2: Deserializer<'de>>(self, deserializer: D2) -> Result<Self::Value, D2::Error> {
      deserializer.deserialize_map(self)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
      let mut hours = Vec::with_capacity(map.size_hint().unwrap_or(0));
      while let Some((day, open)) = map.next_entry::<String, String>()? {
        hours.push((day, open));
      }
      Ok(Some(hours))
    }
  }

  deserializer.deserialize_option(HoursVisitor)
}

impl ApiRestaurant {
  pub fn into_entry(self) -> Entry {
    Entry {
      id: self.id,
      name: self.name,
      category: self.cuisine_type,
      region: self.neighborhood,
      location: Location {
        lat: self.latlng.lat,
        lng: self.latlng.lng,
      },
      address: self.address,
      hours: self.operating_hours,
      reviews: self
        .reviews
        .map(|reviews| reviews.into_iter().map(ApiReview::into_review).collect()),
      photograph: self.photograph,
    }
  }
}

impl ApiReview {
  pub fn into_review(self) -> Review {
    Review {
      author: self.name,
      date: self.date,
      rating: self.rating,
      comment: self.comments,
    }
  }
}
