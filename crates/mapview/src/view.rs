use places::{PlaceCollection, SavedPlace};

/// Zoom used when the map surface is first constructed.
pub const INITIAL_ZOOM: f64 = 13.0;

/// Zoom used for programmatic recenters (list selection, search result).
pub const RECENTER_ZOOM: f64 = 15.0;

/// Seam between the reconciliation logic and the live map surface.
///
/// The wasm implementation wraps the external SDK; tests use a recording
/// fake. Marker handles are opaque to everything but the surface that made
/// them.
pub trait MapSurface {
    type Marker;

    fn create_marker(&mut self, place: &SavedPlace) -> Self::Marker;
    fn destroy_marker(&mut self, marker: Self::Marker);

    fn pan_to(&mut self, lat: f64, lng: f64);
    fn set_zoom(&mut self, level: f64);
    fn set_center(&mut self, lat: f64, lng: f64);
}

/// Exclusive owner of the live marker handles.
#[derive(Debug, Default)]
pub struct MarkerSet<M> {
    handles: Vec<(String, M)>,
}

impl<M> MarkerSet<M> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|(id, _)| id.as_str())
    }

    /// Make the rendered marker set exactly match `places`.
    ///
    /// Full teardown then rebuild: every tracked handle is destroyed and one
    /// marker is created per place, in collection order. O(n) per change, but
    /// there is no drift possible and no diffing logic to get wrong;
    /// acceptable at personal-list scale.
    pub fn reconcile<S>(&mut self, surface: &mut S, places: &PlaceCollection)
    where
        S: MapSurface<Marker = M>,
    {
        for (_, marker) in self.handles.drain(..) {
            surface.destroy_marker(marker);
        }
        for place in places.iter() {
            let marker = surface.create_marker(place);
            self.handles.push((place.id.clone(), marker));
        }
    }

    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MapSurface<Marker = M>,
    {
        for (_, marker) in self.handles.drain(..) {
            surface.destroy_marker(marker);
        }
    }
}

/// Owns the single live map surface and keeps its markers equal to the
/// current place collection.
///
/// Must not be constructed until the SDK loader is `Ready`; the underlying
/// surface types do not exist before that.
pub struct MapView<S: MapSurface> {
    surface: S,
    markers: MarkerSet<S::Marker>,
}

impl<S: MapSurface> MapView<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            markers: MarkerSet::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn reconcile(&mut self, places: &PlaceCollection) {
        self.markers.reconcile(&mut self.surface, places);
    }

    /// Programmatic recenter: pan plus the fixed recenter zoom, issued as two
    /// independent surface calls.
    pub fn recenter(&mut self, lat: f64, lng: f64) {
        self.surface.pan_to(lat, lng);
        self.surface.set_zoom(RECENTER_ZOOM);
    }

    /// Center update without a zoom change (initial geolocation resolution).
    pub fn set_center(&mut self, lat: f64, lng: f64) {
        self.surface.set_center(lat, lng);
    }

    /// Remove all tracked markers from the surface.
    pub fn teardown(&mut self) {
        self.markers.clear(&mut self.surface);
    }
}
