//! Bindings over the mapping SDK's global namespace.
//!
//! The SDK is an opaque external collaborator loaded at runtime by
//! [`crate::script::SdkLoader`]; nothing here may be called before the loader
//! reports `Ready`. All namespace lookups happen at call time, never at
//! module init.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(js_namespace = ["google", "maps"])]
extern "C" {
    #[wasm_bindgen(js_name = Map)]
    pub type SdkMap;

    #[wasm_bindgen(constructor, js_class = "Map")]
    pub fn new(container: &web_sys::Element, options: &JsValue) -> SdkMap;

    #[wasm_bindgen(method, js_name = addListener)]
    pub fn add_listener(this: &SdkMap, event_name: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method, js_name = panTo)]
    pub fn pan_to(this: &SdkMap, center: &JsValue);

    #[wasm_bindgen(method, js_name = setZoom)]
    pub fn set_zoom(this: &SdkMap, level: f64);

    #[wasm_bindgen(method, js_name = setCenter)]
    pub fn set_center(this: &SdkMap, center: &JsValue);
}

#[wasm_bindgen(js_namespace = ["google", "maps"])]
extern "C" {
    #[wasm_bindgen(js_name = Marker)]
    pub type SdkMarker;

    #[wasm_bindgen(constructor, js_class = "Marker")]
    pub fn new(options: &JsValue) -> SdkMarker;

    #[wasm_bindgen(method, js_name = addListener)]
    pub fn add_listener(this: &SdkMarker, event_name: &str, handler: &js_sys::Function);

    /// Passing `null` detaches the marker from its map surface.
    #[wasm_bindgen(method, js_name = setMap)]
    pub fn set_map(this: &SdkMarker, map: &JsValue);
}

#[wasm_bindgen(js_namespace = ["google", "maps"])]
extern "C" {
    #[wasm_bindgen(js_name = InfoWindow)]
    pub type SdkInfoWindow;

    #[wasm_bindgen(constructor, js_class = "InfoWindow")]
    pub fn new(options: &JsValue) -> SdkInfoWindow;

    #[wasm_bindgen(method)]
    pub fn open(this: &SdkInfoWindow, map: &SdkMap, anchor: &SdkMarker);
}

#[wasm_bindgen(js_namespace = ["google", "maps", "places"])]
extern "C" {
    #[wasm_bindgen(js_name = Autocomplete)]
    pub type SdkAutocomplete;

    #[wasm_bindgen(constructor, js_class = "Autocomplete")]
    pub fn new(input: &web_sys::HtmlInputElement, options: &JsValue) -> SdkAutocomplete;

    #[wasm_bindgen(method, js_name = addListener)]
    pub fn add_listener(this: &SdkAutocomplete, event_name: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method, js_name = getPlace)]
    pub fn get_place(this: &SdkAutocomplete) -> JsValue;
}

#[wasm_bindgen(js_namespace = ["google", "maps", "event"])]
extern "C" {
    #[wasm_bindgen(js_name = clearInstanceListeners)]
    pub fn clear_instance_listeners(target: &JsValue);
}

/// Post-load check: the load event alone is not trusted; the root namespace
/// must actually be populated (it is absent when e.g. billing rejected the
/// key after the script was served).
pub fn namespace_ready() -> bool {
    let Some(win) = web_sys::window() else {
        return false;
    };
    let google = js_sys::Reflect::get(win.as_ref(), &JsValue::from_str("google"))
        .unwrap_or(JsValue::UNDEFINED);
    if google.is_undefined() || google.is_null() {
        return false;
    }
    let maps =
        js_sys::Reflect::get(&google, &JsValue::from_str("maps")).unwrap_or(JsValue::UNDEFINED);
    !maps.is_undefined() && !maps.is_null()
}

/// `{ lat, lng }` object literal, the shape every SDK camera/marker call takes.
pub fn lat_lng_literal(lat: f64, lng: f64) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("lat"), &JsValue::from_f64(lat));
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("lng"), &JsValue::from_f64(lng));
    obj.into()
}

/// Read `lat()`/`lng()` off an SDK LatLng instance.
pub fn lat_lng_of(value: &JsValue) -> Option<(f64, f64)> {
    Some((
        call_number_method(value, "lat")?,
        call_number_method(value, "lng")?,
    ))
}

fn call_number_method(target: &JsValue, name: &str) -> Option<f64> {
    let method = js_sys::Reflect::get(target, &JsValue::from_str(name)).ok()?;
    let method: js_sys::Function = method.dyn_into().ok()?;
    method.call0(target).ok()?.as_f64()
}
