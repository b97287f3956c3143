//! One-shot, best-effort read of the user's position at startup.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Ask for the current position once. On success `on_fix(lat, lng)` runs; on
/// unavailability, denial or error nothing happens beyond a console note.
/// There is no retry and no user-facing error.
pub fn request_once(on_fix: Box<dyn FnOnce(f64, f64)>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(geolocation) = window.navigator().geolocation() else {
        web_sys::console::log_1(&JsValue::from_str(
            "geolocation unavailable, keeping default center",
        ));
        return;
    };

    let success = Closure::once_into_js(move |position: JsValue| {
        if let Some((lat, lng)) = position_lat_lng(&position) {
            on_fix(lat, lng);
        }
    });
    let error = Closure::once_into_js(move |_err: JsValue| {
        web_sys::console::log_1(&JsValue::from_str(
            "geolocation denied or failed, keeping default center",
        ));
    });

    let _ = geolocation.get_current_position_with_error_callback(
        success.unchecked_ref(),
        Some(error.unchecked_ref()),
    );
}

fn position_lat_lng(position: &JsValue) -> Option<(f64, f64)> {
    let coords = js_sys::Reflect::get(position, &JsValue::from_str("coords")).ok()?;
    let lat = js_sys::Reflect::get(&coords, &JsValue::from_str("latitude"))
        .ok()?
        .as_f64()?;
    let lng = js_sys::Reflect::get(&coords, &JsValue::from_str("longitude"))
        .ok()?
        .as_f64()?;
    Some((lat, lng))
}
