//! Map surface backed by the external SDK via `loader::sdk`.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use loader::sdk;
use places::SavedPlace;

use crate::center::MapCenter;
use crate::info::info_window_html;
use crate::view::{INITIAL_ZOOM, MapSurface};

/// Live marker plus the info window and click closure keeping it interactive.
pub struct GoogleMarker {
    marker: sdk::SdkMarker,
    _info: sdk::SdkInfoWindow,
    _click: Closure<dyn FnMut()>,
}

/// The one live SDK map. Construction binds a click listener that reports
/// `(lat, lng)` outward and decides nothing itself.
pub struct GoogleMapSurface {
    map: sdk::SdkMap,
    _click: Closure<dyn FnMut(JsValue)>,
}

impl GoogleMapSurface {
    /// Build the map into the container element. Only valid once the SDK
    /// loader is `Ready`.
    pub fn attach(
        container_id: &str,
        center: MapCenter,
        mut on_click: Box<dyn FnMut(f64, f64)>,
    ) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))?
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str("map container element missing"))?;

        let options = js_sys::Object::new();
        set_prop(&options, "center", &sdk::lat_lng_literal(center.lat, center.lng));
        set_prop(&options, "zoom", &JsValue::from_f64(INITIAL_ZOOM));
        set_prop(&options, "mapTypeControl", &JsValue::TRUE);
        set_prop(&options, "streetViewControl", &JsValue::TRUE);
        set_prop(&options, "fullscreenControl", &JsValue::TRUE);

        let map = sdk::SdkMap::new(&container, &options);

        let click = Closure::wrap(Box::new(move |event: JsValue| {
            let lat_lng = js_sys::Reflect::get(&event, &JsValue::from_str("latLng"))
                .unwrap_or(JsValue::UNDEFINED);
            if let Some((lat, lng)) = sdk::lat_lng_of(&lat_lng) {
                on_click(lat, lng);
            }
        }) as Box<dyn FnMut(JsValue)>);
        map.add_listener("click", click.as_ref().unchecked_ref());

        Ok(Self { map, _click: click })
    }

    /// The underlying SDK map object, for handing to the embedding page.
    pub fn raw_handle(&self) -> JsValue {
        self.map.as_ref().clone()
    }
}

impl Drop for GoogleMapSurface {
    fn drop(&mut self) {
        sdk::clear_instance_listeners(self.map.as_ref());
    }
}

impl MapSurface for GoogleMapSurface {
    type Marker = GoogleMarker;

    fn create_marker(&mut self, place: &SavedPlace) -> GoogleMarker {
        let options = js_sys::Object::new();
        set_prop(
            &options,
            "position",
            &sdk::lat_lng_literal(place.lat, place.lng),
        );
        set_prop(&options, "map", self.map.as_ref());
        set_prop(&options, "title", &JsValue::from_str(&place.name));
        let marker = sdk::SdkMarker::new(&options);

        let info_options = js_sys::Object::new();
        set_prop(
            &info_options,
            "content",
            &JsValue::from_str(&info_window_html(place)),
        );
        let info = sdk::SdkInfoWindow::new(&info_options);

        let click = {
            let map = self.map.clone();
            let marker = marker.clone();
            let info = info.clone();
            Closure::wrap(Box::new(move || {
                info.open(&map, &marker);
            }) as Box<dyn FnMut()>)
        };
        marker.add_listener("click", click.as_ref().unchecked_ref());

        GoogleMarker {
            marker,
            _info: info,
            _click: click,
        }
    }

    fn destroy_marker(&mut self, marker: GoogleMarker) {
        marker.marker.set_map(&JsValue::NULL);
        sdk::clear_instance_listeners(marker.marker.as_ref());
    }

    fn pan_to(&mut self, lat: f64, lng: f64) {
        self.map.pan_to(&sdk::lat_lng_literal(lat, lng));
    }

    fn set_zoom(&mut self, level: f64) {
        self.map.set_zoom(level);
    }

    fn set_center(&mut self, lat: f64, lng: f64) {
        self.map.set_center(&sdk::lat_lng_literal(lat, lng));
    }
}

fn set_prop(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &JsValue::from_str(key), value);
}
