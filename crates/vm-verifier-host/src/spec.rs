// SPDX-License-Identifier: GPL-2.0

//! Host platform specification implementation.

use crate::{HostContextProvider, HostHelperProvider, HostMapProvider, HostTypeProvider};
use vm_verifier_core::platform::{MapDef, PlatformSpec};

/// Host platform specification.
///
/// This is the main entry point for using the reference host tables with
/// the verifier. It implements [`PlatformSpec`]; maps are registered per
/// program with [`HostPlatform::with_map`].
///
/// # Example
///
/// ```ignore
/// use vm_verifier_core::verifier::{MainVerifier, VerifierEnv};
/// use vm_verifier_host::HostPlatform;
///
/// let platform = HostPlatform::new().with_map(MapDef::array(1, 64, 16));
/// let mut env = VerifierEnv::new(platform, insns, VerifierConfig::default());
/// let outcome = MainVerifier::new(&mut env).verify();
/// ```
#[derive(Clone, Debug, Default)]
pub struct HostPlatform {
    helper: HostHelperProvider,
    map: HostMapProvider,
    types: HostTypeProvider,
    context: HostContextProvider,
}

impl HostPlatform {
    /// Create a host platform with no maps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a map
    pub fn with_map(mut self, map: MapDef) -> Self {
        self.add_map(map);
        self
    }

    /// Register a map
    pub fn add_map(&mut self, map: MapDef) {
        self.map.insert(map);
    }
}

impl PlatformSpec for HostPlatform {
    type Helper = HostHelperProvider;
    type Map = HostMapProvider;
    type Types = HostTypeProvider;
    type Context = HostContextProvider;

    fn helper(&self) -> &Self::Helper {
        &self.helper
    }

    fn map(&self) -> &Self::Map {
        &self.map
    }

    fn types(&self) -> &Self::Types {
        &self.types
    }

    fn context(&self) -> &Self::Context {
        &self.context
    }

    fn name(&self) -> &'static str {
        "host"
    }
}
