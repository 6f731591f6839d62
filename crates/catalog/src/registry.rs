//! Static registry of known release tracks.
//!
//! Maps a group slug to its display metadata and mirror flag. Adding a new
//! data track is a one-entry change here. Unknown slugs are handled by the
//! grouping engine with placeholder metadata — lookups never fail hard.

/// Sort sentinel for slugs missing from the registry; sorts last.
pub const UNKNOWN_ORDER: u32 = 10_000;

/// Display metadata and mirror policy for one release track.
#[derive(Debug, Clone, Copy)]
pub struct TrackInfo {
    pub slug: &'static str,
    pub title: &'static str,
    /// HTML fragments, joined with `<br>` when rendered.
    pub description: &'static [&'static str],
    /// Sort order in the listing; lower values appear first.
    pub order: u32,
    /// Whether the latest file of this track is mirrored to the local volume.
    pub mirror: bool,
}

const TRACKS: &[TrackInfo] = &[
    TrackInfo {
        slug: "osm",
        title: "OpenStreetMap as vector tiles",
        description: &[
            r#"The full <a href="https://www.openstreetmap.org/">OpenStreetMap</a> planet as vector tilesets with zoom levels 0-14 in <a href="https://shortbread-tiles.org/schema/">Shortbread Schema</a>."#,
            r#"Map Data © <a href="https://www.openstreetmap.org/copyright">OpenStreetMap Contributors</a> available under <a href="https://opendatacommons.org/licenses/odbl/">ODbL</a>"#,
        ],
        order: 0,
        mirror: true,
    },
    TrackInfo {
        slug: "hillshade-vectors",
        title: "Hillshading as vector tiles",
        description: &[
            r#"Hillshade vector tiles based on <a href="https://github.com/tilezen/joerd">Mapzen Jörð Terrain Tiles</a>."#,
            r#"Map Data © <a href="https://github.com/tilezen/joerd/blob/master/docs/attribution.md">Mapzen Terrain Tiles, DEM Sources</a>"#,
        ],
        order: 10,
        mirror: false,
    },
    TrackInfo {
        slug: "landcover-vectors",
        title: "Landcover as vector tiles",
        description: &[
            r#"Landcover vector tiles based on <a href="https://esa-worldcover.org/en/data-access">ESA Worldcover 2021</a>."#,
            r#"Map Data © <a href="https://esa-worldcover.org/en/data-access">ESA WorldCover project 2021</a> / Contains modified Copernicus Sentinel data (2021) processed by ESA WorldCover consortium, available under <a href="http://creativecommons.org/licenses/by/4.0/"> CC-BY 4.0 International</a>"#,
        ],
        order: 20,
        mirror: false,
    },
    TrackInfo {
        slug: "bathymetry-vectors",
        title: "Bathymetry as vector tiles",
        description: &[
            r#"Bathymetry Vectors, derived from the <a href="https://www.gebco.net/data_and_products/historical_data_sets/#gebco_2021">GEBCO 2021 Grid</a>, made with <a href="https://www.naturalearthdata.com/">NaturalEarth</a> by <a href="https://opendem.info">OpenDEM</a>"#,
        ],
        order: 30,
        mirror: false,
    },
    TrackInfo {
        slug: "satellite",
        title: "Satellite imagery (Beta)",
        description: &[r#"Satellite imagery from various sources."#],
        order: 40,
        mirror: false,
    },
];

/// Looks up a track by slug. `None` for unknown slugs; callers fall back to
/// placeholder metadata.
pub fn lookup_track(slug: &str) -> Option<&'static TrackInfo> {
    TRACKS.iter().find(|track| track.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_slugs() {
        let osm = lookup_track("osm").unwrap();
        assert_eq!(osm.order, 0);
        assert!(osm.mirror);
        assert!(lookup_track("satellite").is_some());
        assert!(lookup_track("bathymetry-vectors").is_some());
    }

    #[test]
    fn test_unknown_slug() {
        assert!(lookup_track("foo").is_none());
    }

    #[test]
    fn test_orders_are_distinct_and_below_sentinel() {
        let mut orders: Vec<u32> = TRACKS.iter().map(|t| t.order).collect();
        orders.sort_unstable();
        orders.dedup();
        assert_eq!(orders.len(), TRACKS.len());
        assert!(orders.iter().all(|&o| o < UNKNOWN_ORDER));
    }

    #[test]
    fn test_only_osm_is_mirrored() {
        let mirrored: Vec<&str> = TRACKS.iter().filter(|t| t.mirror).map(|t| t.slug).collect();
        assert_eq!(mirrored, ["osm"]);
    }
}
