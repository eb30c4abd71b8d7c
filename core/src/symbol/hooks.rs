//! file: core/src/symbol/hooks.rs
//! description: lifecycle hook catalogue and entry-point name mangling.
//!
//! The host binds a fixed set of exported entry points to lifecycle
//! callbacks. A user function named after one of those events is renamed
//! to the reserved entry identifier (`Start` -> `_start`) and its
//! parameters are fed from platform-bound slots whose names concatenate
//! the event and parameter names (`OnPlayerJoined(player)` ->
//! `onPlayerJoinedPlayer`).

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::ast::Ty;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<EventParam>,
}

impl EventSig {
    pub fn new(name: &str, params: &[(&str, &str)]) -> Self {
        EventSig {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(n, t)| EventParam { name: n.to_string(), ty: Ty::named(*t) })
                .collect(),
        }
    }

    pub fn entry_name(&self) -> String {
        mangle_hook_name(&self.name)
    }

    /// Platform-bound slot names, in parameter order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.params.iter().map(|p| event_parameter_name(&self.name, &p.name)).collect()
    }
}

lazy_static! {
    static ref BUILTIN_EVENTS: Vec<EventSig> = vec![
        EventSig::new("Start", &[]),
        EventSig::new("Update", &[]),
        EventSig::new("LateUpdate", &[]),
        EventSig::new("FixedUpdate", &[]),
        EventSig::new("Interact", &[]),
        EventSig::new("OnEnable", &[]),
        EventSig::new("OnDisable", &[]),
        EventSig::new("OnDestroy", &[]),
        EventSig::new("OnPickup", &[]),
        EventSig::new("OnDrop", &[]),
        EventSig::new("OnPickupUseDown", &[]),
        EventSig::new("OnPickupUseUp", &[]),
        EventSig::new("OnPreSerialization", &[]),
        EventSig::new("OnDeserialization", &[]),
        EventSig::new("OnPlayerJoined", &[("player", "PlayerApi")]),
        EventSig::new("OnPlayerLeft", &[("player", "PlayerApi")]),
        EventSig::new("OnOwnershipTransferred", &[("player", "PlayerApi")]),
        EventSig::new("OnPlayerTriggerEnter", &[("player", "PlayerApi")]),
        EventSig::new("OnPlayerTriggerExit", &[("player", "PlayerApi")]),
        EventSig::new("OnTriggerEnter", &[("other", "Collider")]),
        EventSig::new("OnTriggerExit", &[("other", "Collider")]),
        EventSig::new("OnCollisionEnter", &[("other", "Collision")]),
        EventSig::new("OnCollisionExit", &[("other", "Collision")]),
    ];
}

/// Events the host recognizes out of the box.
pub fn builtin_events() -> &'static [EventSig] {
    &BUILTIN_EVENTS
}

/// `Start` -> `_start`, `OnPlayerJoined` -> `_onPlayerJoined`.
pub fn mangle_hook_name(name: &str) -> String {
    format!("_{}", lower_first(name))
}

/// `("OnPlayerJoined", "player")` -> `onPlayerJoinedPlayer`.
pub fn event_parameter_name(event: &str, param: &str) -> String {
    format!("{}{}", lower_first(event), upper_first(param))
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
