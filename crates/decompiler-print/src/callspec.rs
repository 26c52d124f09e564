//! Call-spec resolution at callsites (spec.md §4.7).
//!
//! A call-spec is "which `PrototypeModel` applies at this particular
//! callsite" -- ordinarily the callee's own prototype, but a
//! `Override::Prototype` can replace it with a named model for one
//! callsite only. Grounded on `server/project_agent.rs`'s keyed-registry
//! pattern (`HashMap<key, session>` with assign/lookup), repurposed from
//! per-agent sessions to named calling-convention models.

use std::collections::HashMap;

use decompiler_core::Address;

use crate::error::PrintError;
use crate::overrideapply::OverrideApplyReport;
use crate::prototype::{CallsiteObservation, PrototypeModel};

/// A registry of named prototype models a `Override::Prototype` override
/// can select by name (e.g. `"stdcall"`, `"fastcall"`, or a
/// project-specific fixup name).
#[derive(Debug, Clone, Default)]
pub struct CallSpecRegistry {
    models: HashMap<String, PrototypeModel>,
}

impl CallSpecRegistry {
    pub fn new() -> Self {
        CallSpecRegistry { models: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, model: PrototypeModel) {
        self.models.insert(name.into(), model);
    }

    pub fn get(&self, name: &str) -> Option<&PrototypeModel> {
        self.models.get(name)
    }
}

/// Resolves the prototype model that applies at `call_site`: the named
/// override's model if `report` records one, else `default`.
pub fn resolve_call_spec<'a>(
    call_site: Address,
    report: &OverrideApplyReport,
    registry: &'a CallSpecRegistry,
    default: &'a PrototypeModel,
) -> Result<&'a PrototypeModel, PrintError> {
    match report.call_spec_overrides.get(&call_site) {
        Some(model_name) => registry
            .get(model_name)
            .ok_or_else(|| PrintError::UnknownCallSpecModel { model: model_name.clone() }),
        None => Ok(default),
    }
}

/// Merges per-callsite observations into the unlocked models of `registry`,
/// the "produce prototypes" pass of spec.md §4.7. Locked models (input or
/// model lock) are left untouched by [`crate::prototype::produce_prototypes`].
pub fn produce_prototypes_pass(
    registry: &mut CallSpecRegistry,
    observations: &HashMap<String, Vec<CallsiteObservation>>,
    config: &decompiler_core::ArchitectureConfig,
) {
    for (name, obs) in observations {
        if let Some(model) = registry.models.get_mut(name) {
            crate::prototype::produce_prototypes(model, obs, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{ArchitectureConfig, SpaceId, TypeId};

    fn addr(off: u64) -> Address {
        Address::new(SpaceId(1), off)
    }

    #[test]
    fn resolve_with_no_override_returns_default() {
        let registry = CallSpecRegistry::new();
        let report = OverrideApplyReport::default();
        let default = PrototypeModel::unlocked(TypeId::VOID);
        let resolved = resolve_call_spec(addr(0x100), &report, &registry, &default).unwrap();
        assert_eq!(resolved, &default);
    }

    #[test]
    fn resolve_with_override_returns_named_model() {
        let mut registry = CallSpecRegistry::new();
        let mut named = PrototypeModel::unlocked(TypeId::INT4);
        named.is_variadic = true;
        registry.register("variadic_cdecl", named.clone());

        let mut report = OverrideApplyReport::default();
        report.call_spec_overrides.insert(addr(0x100), "variadic_cdecl".to_string());

        let default = PrototypeModel::unlocked(TypeId::VOID);
        let resolved = resolve_call_spec(addr(0x100), &report, &registry, &default).unwrap();
        assert_eq!(resolved, &named);
    }

    #[test]
    fn resolve_with_unregistered_override_errors() {
        let registry = CallSpecRegistry::new();
        let mut report = OverrideApplyReport::default();
        report.call_spec_overrides.insert(addr(0x100), "nonexistent".to_string());
        let default = PrototypeModel::unlocked(TypeId::VOID);
        assert!(resolve_call_spec(addr(0x100), &report, &registry, &default).is_err());
    }

    #[test]
    fn produce_prototypes_pass_widens_registered_model() {
        let mut registry = CallSpecRegistry::new();
        registry.register("cdecl", PrototypeModel::unlocked(TypeId::VOID));
        let mut observations = HashMap::new();
        observations.insert(
            "cdecl".to_string(),
            vec![CallsiteObservation { argument_count: 1, argument_types: vec![TypeId::INT4] }],
        );
        produce_prototypes_pass(&mut registry, &observations, &ArchitectureConfig::default());
        assert_eq!(registry.get("cdecl").unwrap().params.len(), 1);
    }
}
