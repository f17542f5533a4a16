//! Map embed and directions links for a shop location.

use harmony_core::{CatalogEntry, MapLinks, Shop};
use reqwest::Url;

const OSM_EMBED_URL: &str = "https://www.openstreetmap.org/export/embed.html";
const GOOGLE_EMBED_URL: &str = "https://www.google.com/maps/embed/v1/place";
const GOOGLE_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";
/// Half-width of the OpenStreetMap preview box, in degrees.
const OSM_BBOX_DELTA: f64 = 0.01;

/// Builds map links. Embeds use Google Maps when a key is configured and
/// OpenStreetMap otherwise; directions always go to Google Maps.
#[derive(Debug, Clone, Default)]
pub struct MapUrlBuilder {
    google_api_key: Option<String>,
}

impl MapUrlBuilder {
    #[must_use]
    pub fn new(google_api_key: Option<String>) -> Self {
        Self { google_api_key }
    }

    #[must_use]
    pub fn embed_url(&self, lat: f64, lon: f64) -> String {
        match &self.google_api_key {
            Some(key) => {
                let q = format!("{},{}", coord(lat), coord(lon));
                let params = [("key", key.as_str()), ("q", q.as_str())];
                Url::parse_with_params(GOOGLE_EMBED_URL, &params)
                    .map_or_else(|_| osm_embed_url(lat, lon), String::from)
            }
            None => osm_embed_url(lat, lon),
        }
    }

    #[must_use]
    pub fn directions_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{GOOGLE_DIRECTIONS_URL}?api=1&destination={},{}",
            coord(lat),
            coord(lon)
        )
    }

    /// Links for a shop, or `None` when it has no coordinates.
    #[must_use]
    pub fn for_shop(&self, shop: &Shop) -> Option<MapLinks> {
        shop.coordinates().map(|(lat, lon)| MapLinks {
            embed_url: self.embed_url(lat, lon),
            directions_url: self.directions_url(lat, lon),
        })
    }

    pub fn attach(&self, entries: &mut [CatalogEntry]) {
        for entry in entries {
            entry.maps = self.for_shop(&entry.shop);
        }
    }
}

fn coord(value: f64) -> String {
    format!("{value:.6}")
}

fn osm_embed_url(lat: f64, lon: f64) -> String {
    format!(
        "{OSM_EMBED_URL}?bbox={},{},{},{}&layer=mapnik&marker={},{}",
        coord(lon - OSM_BBOX_DELTA),
        coord(lat - OSM_BBOX_DELTA),
        coord(lon + OSM_BBOX_DELTA),
        coord(lat + OSM_BBOX_DELTA),
        coord(lat),
        coord(lon),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osm_embed_is_a_small_box_around_the_point() {
        let maps = MapUrlBuilder::new(None);
        assert_eq!(
            maps.embed_url(-6.2088, 106.8456),
            "https://www.openstreetmap.org/export/embed.html\
             ?bbox=106.835600,-6.218800,106.855600,-6.198800\
             &layer=mapnik&marker=-6.208800,106.845600"
        );
    }

    #[test]
    fn google_embed_used_when_key_present() {
        let maps = MapUrlBuilder::new(Some("abc 123".to_string()));
        let url = maps.embed_url(-8.6705, 115.2126);
        assert!(url.starts_with("https://www.google.com/maps/embed/v1/place?key=abc+123"));
        assert!(url.contains("q=-8.670500%2C115.212600"));
    }

    #[test]
    fn directions_always_google() {
        for key in [None, Some("k".to_string())] {
            let maps = MapUrlBuilder::new(key);
            assert_eq!(
                maps.directions_url(-7.7956, 110.3695),
                "https://www.google.com/maps/dir/?api=1&destination=-7.795600,110.369500"
            );
        }
    }
}
