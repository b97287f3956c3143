/// Current camera center, owned by the orchestrating layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapCenter {
    pub lat: f64,
    pub lng: f64,
}

/// Fallback center used until (and unless) geolocation resolves: Nairobi.
pub const DEFAULT_CENTER: MapCenter = MapCenter {
    lat: -1.286389,
    lng: 36.817223,
};

impl MapCenter {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Apply a best-effort geolocation fix. `None` (unavailable, denied,
    /// errored) leaves the current center untouched; returns whether the
    /// center changed.
    pub fn apply_fix(&mut self, fix: Option<(f64, f64)>) -> bool {
        match fix {
            Some((lat, lng)) => {
                *self = Self { lat, lng };
                true
            }
            None => false,
        }
    }
}

impl Default for MapCenter {
    fn default() -> Self {
        DEFAULT_CENTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_fix_keeps_default_center() {
        let mut center = MapCenter::default();
        assert!(!center.apply_fix(None));
        assert_eq!(center, DEFAULT_CENTER);
    }

    #[test]
    fn successful_fix_overwrites_center() {
        let mut center = MapCenter::default();
        assert!(center.apply_fix(Some((51.5074, -0.1278))));
        assert_eq!(center, MapCenter::new(51.5074, -0.1278));
    }
}
