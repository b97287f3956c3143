/// Interval between namespace probes while another load is in flight.
pub const POLL_INTERVAL_MS: u32 = 100;

/// How long to wait for an in-flight load before giving up.
pub const LOAD_TIMEOUT_MS: u32 = 30_000;

/// Substring the SDK emits in global runtime errors when billing is not
/// enabled for the configured project.
pub const BILLING_ERROR_SIGNATURE: &str = "BillingNotEnabledMapError";

const SDK_SCRIPT_URL_BASE: &str = "https://maps.googleapis.com/maps/api/js";

/// Script URL for the mapping SDK, including the places library used by the
/// search bridge.
pub fn sdk_script_url(api_key: &str) -> String {
    format!("{SDK_SCRIPT_URL_BASE}?key={api_key}&libraries=places")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    MissingCredential,
    ScriptFailed(String),
    NamespaceMissing,
    Billing,
    TimedOut,
}

impl LoadError {
    /// Stable machine-readable tag for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::MissingCredential => "missing-credential",
            LoadError::ScriptFailed(_) => "script-failed",
            LoadError::NamespaceMissing => "sdk-unavailable",
            LoadError::Billing => "billing",
            LoadError::TimedOut => "timeout",
        }
    }

    /// User-facing guidance. Billing failures get specific wording; the only
    /// retry path for any of these is a full page reload.
    pub fn guidance(&self) -> &'static str {
        match self {
            LoadError::MissingCredential => {
                "No maps API key is configured. Set the key and reload the page."
            }
            LoadError::ScriptFailed(_) => {
                "Failed to load the maps script. This is usually due to billing \
                 not being enabled; check your network and billing settings, \
                 then reload the page."
            }
            LoadError::NamespaceMissing => {
                "The maps API loaded but is not available. Check your billing \
                 settings, then reload the page."
            }
            LoadError::Billing => {
                "Billing is not enabled for the maps API. Enable billing for \
                 the project, then reload the page."
            }
            LoadError::TimedOut => {
                "The maps script did not finish loading. Check your network \
                 and billing settings, then reload the page."
            }
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::MissingCredential => write!(f, "missing credential"),
            LoadError::ScriptFailed(detail) => write!(f, "script load failed: {detail}"),
            LoadError::NamespaceMissing => {
                write!(f, "script loaded but the SDK namespace is missing")
            }
            LoadError::Billing => write!(f, "billing not enabled for the maps API"),
            LoadError::TimedOut => write!(f, "timed out waiting for the maps script"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Lifecycle of the one SDK load per page.
///
/// `Ready` and `Failed` are terminal for a loader instance; a new page load
/// starts fresh.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(LoadError),
}

impl LoadPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadPhase::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadPhase::Ready | LoadPhase::Failed(_))
    }
}

/// Environment snapshot taken when a load is first requested.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BeginProbe {
    pub credential_present: bool,
    pub sdk_present: bool,
    pub script_tag_present: bool,
}

/// What the driver must do after `begin`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadAction {
    /// Nothing to drive; the machine is already terminal.
    None,
    /// Insert the loader script tag and wait for its load/error events.
    InsertScript,
    /// Another load is in flight; poll the namespace until ready or timeout.
    PollExisting,
}

/// Explicit state machine behind the SDK load lifecycle.
///
/// Every transition is driven by a named input so each one is independently
/// testable; the wasm driver owns the DOM side effects.
#[derive(Debug, Default)]
pub struct LoadStateMachine {
    phase: LoadPhase,
}

impl LoadStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    /// One-shot entry point. Resolves synchronously when the SDK is already
    /// present or the credential is missing; otherwise enters `Loading` and
    /// tells the driver how to proceed.
    pub fn begin(&mut self, probe: BeginProbe) -> LoadAction {
        if self.phase != LoadPhase::Idle {
            return LoadAction::None;
        }
        if probe.sdk_present {
            self.phase = LoadPhase::Ready;
            return LoadAction::None;
        }
        if !probe.credential_present {
            self.phase = LoadPhase::Failed(LoadError::MissingCredential);
            return LoadAction::None;
        }
        self.phase = LoadPhase::Loading;
        if probe.script_tag_present {
            LoadAction::PollExisting
        } else {
            LoadAction::InsertScript
        }
    }

    /// The script's load event fired. The post-load namespace check defends
    /// against a script that reports success while the API failed to
    /// initialize.
    pub fn script_loaded(&mut self, sdk_present: bool) {
        if self.phase != LoadPhase::Loading {
            return;
        }
        self.phase = if sdk_present {
            LoadPhase::Ready
        } else {
            LoadPhase::Failed(LoadError::NamespaceMissing)
        };
    }

    /// The script's error event fired.
    pub fn script_errored(&mut self, detail: impl Into<String>) {
        if self.phase != LoadPhase::Loading {
            return;
        }
        self.phase = LoadPhase::Failed(LoadError::ScriptFailed(detail.into()));
    }

    /// A global runtime error was observed. Returns `true` when it matched
    /// the billing signature and failed the load.
    pub fn global_error(&mut self, message: &str) -> bool {
        if self.phase != LoadPhase::Loading {
            return false;
        }
        if !message.contains(BILLING_ERROR_SIGNATURE) {
            return false;
        }
        self.phase = LoadPhase::Failed(LoadError::Billing);
        true
    }

    /// Periodic namespace probe while waiting on an in-flight load. Returns
    /// `true` when this poll completed the load.
    pub fn poll(&mut self, sdk_present: bool) -> bool {
        if self.phase != LoadPhase::Loading || !sdk_present {
            return false;
        }
        self.phase = LoadPhase::Ready;
        true
    }

    /// The load timeout elapsed. Returns `true` only for the call that
    /// produced the failure, so the driver signals it exactly once.
    pub fn timed_out(&mut self) -> bool {
        if self.phase != LoadPhase::Loading {
            return false;
        }
        self.phase = LoadPhase::Failed(LoadError::TimedOut);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn probe() -> BeginProbe {
        BeginProbe {
            credential_present: true,
            sdk_present: false,
            script_tag_present: false,
        }
    }

    #[test]
    fn missing_credential_fails_synchronously_without_insertion() {
        let mut m = LoadStateMachine::new();
        let action = m.begin(BeginProbe {
            credential_present: false,
            ..probe()
        });
        assert_eq!(action, LoadAction::None);
        assert_eq!(m.phase(), &LoadPhase::Failed(LoadError::MissingCredential));
    }

    #[test]
    fn already_present_sdk_short_circuits_to_ready() {
        let mut m = LoadStateMachine::new();
        let action = m.begin(BeginProbe {
            sdk_present: true,
            ..probe()
        });
        assert_eq!(action, LoadAction::None);
        assert_eq!(m.phase(), &LoadPhase::Ready);
    }

    #[test]
    fn fresh_load_inserts_script() {
        let mut m = LoadStateMachine::new();
        assert_eq!(m.begin(probe()), LoadAction::InsertScript);
        assert_eq!(m.phase(), &LoadPhase::Loading);
    }

    #[test]
    fn in_flight_tag_polls_instead_of_inserting_again() {
        let mut m = LoadStateMachine::new();
        let action = m.begin(BeginProbe {
            script_tag_present: true,
            ..probe()
        });
        assert_eq!(action, LoadAction::PollExisting);
    }

    #[test]
    fn begin_is_one_shot() {
        let mut m = LoadStateMachine::new();
        assert_eq!(m.begin(probe()), LoadAction::InsertScript);
        // A second consumer request must never start a second insertion.
        assert_eq!(m.begin(probe()), LoadAction::None);
        assert_eq!(m.phase(), &LoadPhase::Loading);
    }

    #[test]
    fn load_with_populated_namespace_is_ready() {
        let mut m = LoadStateMachine::new();
        m.begin(probe());
        m.script_loaded(true);
        assert_eq!(m.phase(), &LoadPhase::Ready);
    }

    #[test]
    fn load_with_empty_namespace_fails_post_check() {
        let mut m = LoadStateMachine::new();
        m.begin(probe());
        m.script_loaded(false);
        assert_eq!(m.phase(), &LoadPhase::Failed(LoadError::NamespaceMissing));
    }

    #[test]
    fn script_error_fails_the_load() {
        let mut m = LoadStateMachine::new();
        m.begin(probe());
        m.script_errored("network");
        assert_eq!(
            m.phase(),
            &LoadPhase::Failed(LoadError::ScriptFailed("network".to_string()))
        );
    }

    #[test]
    fn billing_signature_is_distinguished() {
        let mut m = LoadStateMachine::new();
        m.begin(probe());
        assert!(!m.global_error("SomeOtherMapError"));
        assert_eq!(m.phase(), &LoadPhase::Loading);

        assert!(m.global_error("Google Maps: BillingNotEnabledMapError"));
        assert_eq!(m.phase(), &LoadPhase::Failed(LoadError::Billing));
    }

    #[test]
    fn poll_resolves_when_namespace_appears() {
        let mut m = LoadStateMachine::new();
        m.begin(BeginProbe {
            script_tag_present: true,
            ..probe()
        });
        assert!(!m.poll(false));
        assert!(!m.poll(false));
        assert!(m.poll(true));
        assert_eq!(m.phase(), &LoadPhase::Ready);
    }

    #[test]
    fn timeout_fails_exactly_once() {
        let mut m = LoadStateMachine::new();
        m.begin(BeginProbe {
            script_tag_present: true,
            ..probe()
        });
        assert!(m.timed_out());
        assert!(!m.timed_out());
        assert_eq!(m.phase(), &LoadPhase::Failed(LoadError::TimedOut));
    }

    #[test]
    fn terminal_phases_ignore_late_events() {
        let mut m = LoadStateMachine::new();
        m.begin(probe());
        m.script_loaded(true);

        m.script_errored("late");
        m.timed_out();
        assert!(!m.global_error(BILLING_ERROR_SIGNATURE));
        assert!(!m.poll(true));
        assert_eq!(m.phase(), &LoadPhase::Ready);
    }

    #[test]
    fn script_url_includes_key_and_places_library() {
        let url = sdk_script_url("abc123");
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/js?key=abc123&libraries=places"
        );
    }
}
