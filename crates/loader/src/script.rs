//! DOM driver for [`crate::machine::LoadStateMachine`].
//!
//! Owns every side effect of the load: the single script tag, the load/error
//! listeners, the global billing-error listener, and the poll/timeout timers
//! used while another load is in flight. All of it is released on teardown so
//! a later mount can retry cleanly.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::machine::{
    BeginProbe, LOAD_TIMEOUT_MS, LoadAction, LoadPhase, LoadStateMachine, POLL_INTERVAL_MS,
    sdk_script_url,
};
use crate::sdk;

const SCRIPT_ELEMENT_ID: &str = "maps-sdk-loader";
const SCRIPT_TAG_QUERY: &str = "script[src*=\"maps.googleapis.com\"]";

static SLOT_HELD: AtomicBool = AtomicBool::new(false);

/// Process-wide claim on the single SDK script slot.
///
/// The SDK namespace and its loader tag are page-global, so only one loader
/// lifecycle may be active at a time. Acquire-once, released on drop.
pub struct SdkScriptSlot(());

impl SdkScriptSlot {
    pub fn acquire() -> Option<Self> {
        SLOT_HELD
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(()))
    }
}

impl Drop for SdkScriptSlot {
    fn drop(&mut self) {
        SLOT_HELD.store(false, Ordering::SeqCst);
    }
}

/// Invoked exactly once, when the phase first turns terminal. May fire
/// synchronously from [`SdkLoader::start`] (missing credential, SDK already
/// present).
pub type SettledCallback = Box<dyn FnMut(&LoadPhase)>;

struct Inner {
    machine: LoadStateMachine,
    _slot: SdkScriptSlot,
    script: Option<web_sys::Element>,
    onload: Option<Closure<dyn FnMut()>>,
    onerror: Option<Closure<dyn FnMut()>>,
    global_error: Option<Closure<dyn FnMut(web_sys::ErrorEvent)>>,
    poll_id: Option<i32>,
    poll_closure: Option<Closure<dyn FnMut()>>,
    timeout_id: Option<i32>,
    timeout_closure: Option<Closure<dyn FnMut()>>,
    on_settled: Option<SettledCallback>,
}

impl Inner {
    fn stop_timers(&mut self) {
        let window = web_sys::window();
        if let Some(id) = self.poll_id.take()
            && let Some(win) = window.as_ref()
        {
            win.clear_interval_with_handle(id);
        }
        if let Some(id) = self.timeout_id.take()
            && let Some(win) = window.as_ref()
        {
            win.clear_timeout_with_handle(id);
        }
        self.poll_closure = None;
        self.timeout_closure = None;
    }
}

/// Loads the external mapping SDK script exactly once per page lifetime and
/// reports readiness to its consumer.
pub struct SdkLoader {
    inner: Rc<RefCell<Inner>>,
}

impl SdkLoader {
    /// Begin the load. Resolves synchronously when the SDK is already present
    /// or the credential is missing/blank; otherwise inserts the script tag,
    /// or polls an existing in-flight tag instead of inserting a second one.
    pub fn start(api_key: Option<&str>, on_settled: SettledCallback) -> Result<Self, JsValue> {
        let Some(slot) = SdkScriptSlot::acquire() else {
            return Err(JsValue::from_str("an SDK loader is already active"));
        };
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());
        let probe = BeginProbe {
            credential_present: api_key.is_some(),
            sdk_present: sdk::namespace_ready(),
            script_tag_present: document
                .query_selector(SCRIPT_TAG_QUERY)
                .ok()
                .flatten()
                .is_some(),
        };

        let inner = Rc::new(RefCell::new(Inner {
            machine: LoadStateMachine::new(),
            _slot: slot,
            script: None,
            onload: None,
            onerror: None,
            global_error: None,
            poll_id: None,
            poll_closure: None,
            timeout_id: None,
            timeout_closure: None,
            on_settled: Some(on_settled),
        }));

        let action = inner.borrow_mut().machine.begin(probe);
        match action {
            LoadAction::None => settle_if_terminal(&inner),
            LoadAction::InsertScript => {
                let key = api_key.unwrap_or_default();
                insert_script(&inner, &document, key)?;
                install_global_error_listener(&inner, &window)?;
            }
            LoadAction::PollExisting => {
                install_global_error_listener(&inner, &window)?;
                start_poll_timers(&inner, &window)?;
            }
        }

        Ok(Self { inner })
    }

    pub fn phase(&self) -> LoadPhase {
        self.inner.borrow().machine.phase().clone()
    }

    /// Release every DOM resource: script tag, timers, global error listener.
    /// Idempotent; also runs on drop.
    pub fn teardown(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.stop_timers();
        if let Some(script) = inner.script.take() {
            script.remove();
        }
        inner.onload = None;
        inner.onerror = None;
        if let Some(listener) = inner.global_error.take()
            && let Some(win) = web_sys::window()
        {
            let _ =
                win.remove_event_listener_with_callback("error", listener.as_ref().unchecked_ref());
        }
        inner.on_settled = None;
    }
}

impl Drop for SdkLoader {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn settle_if_terminal(inner: &Rc<RefCell<Inner>>) {
    let (phase, callback) = {
        let mut b = inner.borrow_mut();
        if !b.machine.phase().is_terminal() {
            return;
        }
        b.stop_timers();
        (b.machine.phase().clone(), b.on_settled.take())
    };
    if let Some(mut cb) = callback {
        cb(&phase);
    }
}

fn insert_script(
    inner: &Rc<RefCell<Inner>>,
    document: &web_sys::Document,
    api_key: &str,
) -> Result<(), JsValue> {
    let script = document.create_element("script")?;
    script.set_id(SCRIPT_ELEMENT_ID);
    script.set_attribute("src", &sdk_script_url(api_key))?;
    script.set_attribute("async", "")?;
    script.set_attribute("defer", "")?;

    let onload = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let ready = sdk::namespace_ready();
            inner.borrow_mut().machine.script_loaded(ready);
            settle_if_terminal(&inner);
        }) as Box<dyn FnMut()>)
    };
    script.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;

    let onerror = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            inner
                .borrow_mut()
                .machine
                .script_errored("script load or network error");
            settle_if_terminal(&inner);
        }) as Box<dyn FnMut()>)
    };
    script.add_event_listener_with_callback("error", onerror.as_ref().unchecked_ref())?;

    document
        .head()
        .ok_or_else(|| JsValue::from_str("no document head"))?
        .append_child(&script)?;

    let mut b = inner.borrow_mut();
    b.script = Some(script);
    b.onload = Some(onload);
    b.onerror = Some(onerror);
    Ok(())
}

fn install_global_error_listener(
    inner: &Rc<RefCell<Inner>>,
    window: &web_sys::Window,
) -> Result<(), JsValue> {
    let listener = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move |event: web_sys::ErrorEvent| {
            let Some(inner) = weak.upgrade() else { return };
            let matched = inner.borrow_mut().machine.global_error(&event.message());
            if matched {
                settle_if_terminal(&inner);
            }
        }) as Box<dyn FnMut(web_sys::ErrorEvent)>)
    };
    window.add_event_listener_with_callback("error", listener.as_ref().unchecked_ref())?;
    inner.borrow_mut().global_error = Some(listener);
    Ok(())
}

fn start_poll_timers(inner: &Rc<RefCell<Inner>>, window: &web_sys::Window) -> Result<(), JsValue> {
    let poll = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let ready = sdk::namespace_ready();
            if inner.borrow_mut().machine.poll(ready) {
                settle_if_terminal(&inner);
            }
        }) as Box<dyn FnMut()>)
    };
    let poll_id = window.set_interval_with_callback_and_timeout_and_arguments_0(
        poll.as_ref().unchecked_ref(),
        POLL_INTERVAL_MS as i32,
    )?;

    let timeout = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            if inner.borrow_mut().machine.timed_out() {
                settle_if_terminal(&inner);
            }
        }) as Box<dyn FnMut()>)
    };
    let timeout_id = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        timeout.as_ref().unchecked_ref(),
        LOAD_TIMEOUT_MS as i32,
    )?;

    let mut b = inner.borrow_mut();
    b.poll_id = Some(poll_id);
    b.poll_closure = Some(poll);
    b.timeout_id = Some(timeout_id);
    b.timeout_closure = Some(timeout);
    Ok(())
}
