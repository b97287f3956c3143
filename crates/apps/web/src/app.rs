//! Wiring between the loader, the place book, the map view and the
//! JavaScript presentation layer.
//!
//! The presentation layer drives everything through the exported functions
//! below and receives events through registered callbacks; it decides what a
//! map click or a failed load looks like, this module only reports them.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use loader::script::SdkLoader;
use loader::{LoadError, LoadPhase};
use mapview::google::GoogleMapSurface;
use mapview::{DEFAULT_CENTER, MapCenter, MapView};
use places::{LocalStoragePlaceStore, PlaceBook, STORAGE_KEY};

use crate::geolocate;
use crate::search::SearchBridge;

/// Element ids the embedding page must provide.
pub const MAP_CONTAINER_ID: &str = "map";
pub const SEARCH_INPUT_ID: &str = "place-search";

#[derive(Default)]
struct Callbacks {
    on_map_click: Option<js_sys::Function>,
    on_search_select: Option<js_sys::Function>,
    on_map_ready: Option<js_sys::Function>,
    on_load_failed: Option<js_sys::Function>,
}

struct AppState {
    loader: Option<SdkLoader>,
    view: Option<MapView<GoogleMapSurface>>,
    book: Option<PlaceBook<LocalStoragePlaceStore>>,
    search: Option<SearchBridge>,
    center: MapCenter,
    callbacks: Callbacks,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState {
        loader: None,
        view: None,
        book: None,
        search: None,
        center: DEFAULT_CENTER,
        callbacks: Callbacks::default(),
    });
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Load the place book and begin the SDK load. May settle synchronously
/// (missing credential, SDK already present); register callbacks first.
#[wasm_bindgen]
pub fn boot(api_key: Option<String>) -> Result<(), JsValue> {
    STATE.with(|s| {
        s.borrow_mut().book = Some(PlaceBook::open(LocalStoragePlaceStore::new(STORAGE_KEY)));
    });
    let loader = SdkLoader::start(api_key.as_deref(), Box::new(on_loader_settled))?;
    STATE.with(|s| s.borrow_mut().loader = Some(loader));
    Ok(())
}

/// Release the map, search bridge and loader resources so a later `boot` can
/// start clean.
#[wasm_bindgen]
pub fn teardown() {
    STATE.with(|s| {
        let st = &mut *s.borrow_mut();
        st.search = None;
        if let Some(mut view) = st.view.take() {
            view.teardown();
        }
        if let Some(loader) = st.loader.take() {
            loader.teardown();
        }
        st.book = None;
        st.center = DEFAULT_CENTER;
    });
}

#[wasm_bindgen]
pub fn set_on_map_click(callback: js_sys::Function) {
    STATE.with(|s| s.borrow_mut().callbacks.on_map_click = Some(callback));
}

#[wasm_bindgen]
pub fn set_on_search_select(callback: js_sys::Function) {
    STATE.with(|s| s.borrow_mut().callbacks.on_search_select = Some(callback));
}

#[wasm_bindgen]
pub fn set_on_map_ready(callback: js_sys::Function) {
    STATE.with(|s| s.borrow_mut().callbacks.on_map_ready = Some(callback));
}

#[wasm_bindgen]
pub fn set_on_load_failed(callback: js_sys::Function) {
    STATE.with(|s| s.borrow_mut().callbacks.on_load_failed = Some(callback));
}

#[wasm_bindgen]
pub fn sdk_phase() -> String {
    STATE.with(|s| match s.borrow().loader.as_ref().map(|l| l.phase()) {
        None | Some(LoadPhase::Idle) => "idle".to_string(),
        Some(LoadPhase::Loading) => "loading".to_string(),
        Some(LoadPhase::Ready) => "ready".to_string(),
        Some(LoadPhase::Failed(e)) => format!("failed:{}", e.kind()),
    })
}

/// Add a place (called by the presentation layer once it has collected a
/// name), persist it and rebuild the markers. Returns the new place as JSON.
#[wasm_bindgen]
pub fn save_place(name: String, lat: f64, lng: f64) -> Result<String, JsValue> {
    let now_ms = js_sys::Date::now() as u64;
    STATE.with(|s| {
        let st = &mut *s.borrow_mut();
        let book = st
            .book
            .as_mut()
            .ok_or_else(|| JsValue::from_str("app not booted"))?;
        let place = book
            .add(&name, lat, lng, now_ms)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        if let Some(view) = st.view.as_mut() {
            view.reconcile(book.places());
        }
        serde_json::to_string(&place).map_err(|e| JsValue::from_str(&e.to_string()))
    })
}

/// Remove a place by id and rebuild the markers. Absent ids return `false`.
#[wasm_bindgen]
pub fn delete_place(id: String) -> Result<bool, JsValue> {
    STATE.with(|s| {
        let st = &mut *s.borrow_mut();
        let book = st
            .book
            .as_mut()
            .ok_or_else(|| JsValue::from_str("app not booted"))?;
        let removed = book
            .remove(&id)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        if removed && let Some(view) = st.view.as_mut() {
            view.reconcile(book.places());
        }
        Ok(removed)
    })
}

/// Current collection as JSON, for list rendering.
#[wasm_bindgen]
pub fn places_json() -> String {
    STATE.with(|s| {
        s.borrow()
            .book
            .as_ref()
            .and_then(|book| serde_json::to_string(book.places()).ok())
            .unwrap_or_else(|| "[]".to_string())
    })
}

/// Recenter the camera on a saved place.
#[wasm_bindgen]
pub fn focus_place(id: String) -> bool {
    STATE.with(|s| {
        let st = &mut *s.borrow_mut();
        let Some(book) = st.book.as_ref() else {
            return false;
        };
        let Some(place) = book.places().get(&id) else {
            return false;
        };
        let (lat, lng) = (place.lat, place.lng);
        st.center = MapCenter::new(lat, lng);
        if let Some(view) = st.view.as_mut() {
            view.recenter(lat, lng);
        }
        true
    })
}

fn on_loader_settled(phase: &LoadPhase) {
    match phase {
        LoadPhase::Ready => {
            if let Err(err) = build_map() {
                web_sys::console::warn_1(&err);
            }
        }
        LoadPhase::Failed(error) => notify_load_failed(error),
        LoadPhase::Idle | LoadPhase::Loading => {}
    }
}

fn build_map() -> Result<(), JsValue> {
    let center = STATE.with(|s| s.borrow().center);

    let surface = GoogleMapSurface::attach(
        MAP_CONTAINER_ID,
        center,
        Box::new(|lat, lng| {
            if let Some(cb) = callback(|c| c.on_map_click.clone()) {
                let _ = cb.call2(
                    &JsValue::NULL,
                    &JsValue::from_f64(lat),
                    &JsValue::from_f64(lng),
                );
            }
        }),
    )?;
    let mut view = MapView::new(surface);

    STATE.with(|s| {
        let st = &mut *s.borrow_mut();
        if let Some(book) = st.book.as_ref() {
            view.reconcile(book.places());
        }
        st.view = Some(view);
    });

    // Best-effort: the embedding page may not include a search input.
    match SearchBridge::attach(SEARCH_INPUT_ID, Box::new(on_search_resolved)) {
        Ok(bridge) => STATE.with(|s| s.borrow_mut().search = Some(bridge)),
        Err(err) => web_sys::console::log_1(&err),
    }

    geolocate::request_once(Box::new(|lat, lng| {
        STATE.with(|s| {
            let st = &mut *s.borrow_mut();
            if st.center.apply_fix(Some((lat, lng))) {
                if let Some(view) = st.view.as_mut() {
                    view.set_center(lat, lng);
                }
            }
        });
    }));

    if let Some(cb) = callback(|c| c.on_map_ready.clone()) {
        let handle = STATE.with(|s| {
            s.borrow()
                .view
                .as_ref()
                .map(|v| v.surface().raw_handle())
                .unwrap_or(JsValue::NULL)
        });
        let _ = cb.call1(&JsValue::NULL, &handle);
    }
    Ok(())
}

fn on_search_resolved(lat: f64, lng: f64) {
    STATE.with(|s| {
        let st = &mut *s.borrow_mut();
        st.center = MapCenter::new(lat, lng);
        if let Some(view) = st.view.as_mut() {
            view.recenter(lat, lng);
        }
    });
    if let Some(cb) = callback(|c| c.on_search_select.clone()) {
        let _ = cb.call2(
            &JsValue::NULL,
            &JsValue::from_f64(lat),
            &JsValue::from_f64(lng),
        );
    }
}

fn notify_load_failed(error: &LoadError) {
    web_sys::console::warn_1(&JsValue::from_str(&format!("maps SDK load failed: {error}")));
    if let Some(cb) = callback(|c| c.on_load_failed.clone()) {
        let _ = cb.call2(
            &JsValue::NULL,
            &JsValue::from_str(error.kind()),
            &JsValue::from_str(error.guidance()),
        );
    }
}

fn callback(pick: impl Fn(&Callbacks) -> Option<js_sys::Function>) -> Option<js_sys::Function> {
    STATE.with(|s| pick(&s.borrow().callbacks))
}
