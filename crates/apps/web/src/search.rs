//! Free-text place search bound to the SDK's autocomplete capability.

/// What an autocomplete selection yields. Geometry is optional: partial or
/// ambiguous matches come back without coordinates.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SelectionCandidate {
    pub location: Option<(f64, f64)>,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub lat: f64,
    pub lng: f64,
    /// Display text written back into the search input.
    pub label: String,
}

/// Resolve a selection to a coordinate, or `None` when the candidate lacks
/// geometry. Candidates without geometry are silently ignored rather than
/// forwarded as an invalid value; the display text is left unchanged.
pub fn resolve_selection(candidate: SelectionCandidate) -> Option<ResolvedPlace> {
    let (lat, lng) = candidate.location?;
    let label = candidate
        .name
        .or(candidate.formatted_address)
        .unwrap_or_default();
    Some(ResolvedPlace { lat, lng, label })
}

#[cfg(target_arch = "wasm32")]
mod bridge {
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use loader::sdk;

    use super::{SelectionCandidate, resolve_selection};

    /// Autocomplete bound to a single text input. Attach only once the SDK
    /// loader is `Ready`; the presentation layer keeps the input disabled
    /// until then.
    pub struct SearchBridge {
        autocomplete: sdk::SdkAutocomplete,
        _changed: Closure<dyn FnMut()>,
    }

    impl SearchBridge {
        pub fn attach(
            input_id: &str,
            mut on_select: Box<dyn FnMut(f64, f64)>,
        ) -> Result<Self, JsValue> {
            let document = web_sys::window()
                .ok_or_else(|| JsValue::from_str("no window"))?
                .document()
                .ok_or_else(|| JsValue::from_str("no document"))?;
            let input: web_sys::HtmlInputElement = document
                .get_element_by_id(input_id)
                .ok_or_else(|| JsValue::from_str("search input element missing"))?
                .dyn_into()
                .map_err(|_| JsValue::from_str("search element is not an input"))?;

            let options = js_sys::Object::new();
            let types = js_sys::Array::new();
            types.push(&JsValue::from_str("establishment"));
            types.push(&JsValue::from_str("geocode"));
            let _ = js_sys::Reflect::set(&options, &JsValue::from_str("types"), &types);
            let fields = js_sys::Array::new();
            for field in ["place_id", "geometry", "name", "formatted_address"] {
                fields.push(&JsValue::from_str(field));
            }
            let _ = js_sys::Reflect::set(&options, &JsValue::from_str("fields"), &fields);

            let autocomplete = sdk::SdkAutocomplete::new(&input, &options);

            let changed = {
                let autocomplete = autocomplete.clone();
                Closure::wrap(Box::new(move || {
                    let candidate = candidate_from_js(&autocomplete.get_place());
                    if let Some(resolved) = resolve_selection(candidate) {
                        input.set_value(&resolved.label);
                        on_select(resolved.lat, resolved.lng);
                    }
                }) as Box<dyn FnMut()>)
            };
            autocomplete.add_listener("place_changed", changed.as_ref().unchecked_ref());

            Ok(Self {
                autocomplete,
                _changed: changed,
            })
        }
    }

    impl Drop for SearchBridge {
        fn drop(&mut self) {
            sdk::clear_instance_listeners(self.autocomplete.as_ref());
        }
    }

    fn candidate_from_js(place: &JsValue) -> SelectionCandidate {
        let location = get(place, "geometry")
            .and_then(|geometry| get(&geometry, "location"))
            .and_then(|location| sdk::lat_lng_of(&location));
        SelectionCandidate {
            location,
            name: get(place, "name").and_then(|v| v.as_string()),
            formatted_address: get(place, "formatted_address").and_then(|v| v.as_string()),
        }
    }

    fn get(target: &JsValue, key: &str) -> Option<JsValue> {
        let value = js_sys::Reflect::get(target, &JsValue::from_str(key)).ok()?;
        if value.is_undefined() || value.is_null() {
            None
        } else {
            Some(value)
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use bridge::SearchBridge;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn candidate_without_geometry_emits_nothing() {
        let candidate = SelectionCandidate {
            location: None,
            name: Some("Somewhere".to_string()),
            formatted_address: Some("1 Some St".to_string()),
        };
        assert_eq!(resolve_selection(candidate), None);
    }

    #[test]
    fn name_is_preferred_over_formatted_address() {
        let resolved = resolve_selection(SelectionCandidate {
            location: Some((1.5, 2.5)),
            name: Some("Cafe Nero".to_string()),
            formatted_address: Some("1 Some St".to_string()),
        })
        .unwrap();
        assert_eq!(resolved.lat, 1.5);
        assert_eq!(resolved.lng, 2.5);
        assert_eq!(resolved.label, "Cafe Nero");
    }

    #[test]
    fn formatted_address_is_the_fallback_label() {
        let resolved = resolve_selection(SelectionCandidate {
            location: Some((0.0, 0.0)),
            name: None,
            formatted_address: Some("1 Some St".to_string()),
        })
        .unwrap();
        assert_eq!(resolved.label, "1 Some St");
    }

    #[test]
    fn missing_labels_resolve_to_empty_text() {
        let resolved = resolve_selection(SelectionCandidate {
            location: Some((0.0, 0.0)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(resolved.label, "");
    }
}
