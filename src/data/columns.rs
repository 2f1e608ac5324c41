// ---------------------------------------------------------------------------
// Geometry column detection
// ---------------------------------------------------------------------------

/// Indices of the coordinate columns found in a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub lat: Option<usize>,
    pub lon: Option<usize>,
}

impl CoordinateColumns {
    /// Both columns, or `None` when either is missing.
    pub fn both(&self) -> Option<(usize, usize)> {
        Some((self.lat?, self.lon?))
    }
}

/// Case-insensitive substring match; the first matching header wins.
///
/// `"latitude"` and `"longitude"` are listed for readability even though
/// `"lat"` and `"lon"` already cover them.
pub fn detect<S: AsRef<str>>(headers: &[S]) -> CoordinateColumns {
    CoordinateColumns {
        lat: find(headers, &["lat", "latitude"]),
        lon: find(headers, &["lon", "lng", "longitude"]),
    }
}

fn find<S: AsRef<str>>(headers: &[S], needles: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.as_ref().to_lowercase();
        needles.iter().any(|n| h.contains(n))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_lat_lon() {
        let cols = detect(&["name", "lat", "lon"]);
        assert_eq!(cols.both(), Some((1, 2)));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let cols = detect(&["Station", "LATITUDE_deg", "Long_X"]);
        assert_eq!(cols.lat, Some(1));
        assert_eq!(cols.lon, Some(2));

        let cols = detect(&["id", "y_lat", "x_lng"]);
        assert_eq!(cols.both(), Some((1, 2)));
    }

    #[test]
    fn first_match_wins() {
        let cols = detect(&["lat_min", "lat_max", "lon_min", "lon_max"]);
        assert_eq!(cols.both(), Some((0, 2)));
    }

    #[test]
    fn missing_either_column_is_not_found() {
        assert_eq!(detect(&["city", "value"]).both(), None);
        assert_eq!(detect(&["city", "lat"]).both(), None);
        assert_eq!(detect(&["city", "lng"]).lat, None);
        assert_eq!(detect::<&str>(&[]).both(), None);
    }
}
