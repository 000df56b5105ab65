// SPDX-License-Identifier: GPL-2.0

//! 平台描述
//!
//! The [`PlatformSpec`] trait bundles the four host tables a run consults:
//! helpers, maps, object types and the context layout. [`NullPlatform`]
//! has all of them empty.

use super::{
    ContextProvider, CtxField, HelperDef, HelperProvider, MapDef, MapProvider, TypeDef,
    TypeProvider,
};

/// Host tables for one verifier run.
///
/// Each table is an associated type, so [`crate::verifier::verify_program`]
/// is monomorphized per host and lookups never go through a vtable. A host
/// only implements the four accessors and [`PlatformSpec::name`]; the
/// `lookup_*` methods forward to the tables.
///
/// ```ignore
/// impl PlatformSpec for HostPlatform {
///     type Helper = HostHelperProvider;
///     type Map = HostMapProvider;
///     type Types = HostTypeProvider;
///     type Context = HostContextProvider;
///
///     fn helper(&self) -> &Self::Helper { &self.helper }
///     fn map(&self) -> &Self::Map { &self.map }
///     fn types(&self) -> &Self::Types { &self.types }
///     fn context(&self) -> &Self::Context { &self.context }
///     fn name(&self) -> &'static str { "host" }
/// }
/// ```
pub trait PlatformSpec: Clone + Send + Sync + 'static {
    /// Helper function provider type
    type Helper: HelperProvider;
    /// Map provider type
    type Map: MapProvider;
    /// Object type provider type
    type Types: TypeProvider;
    /// Context provider type
    type Context: ContextProvider;

    /// Get the helper provider.
    fn helper(&self) -> &Self::Helper;

    /// Get the map provider.
    fn map(&self) -> &Self::Map;

    /// Get the object type provider.
    fn types(&self) -> &Self::Types;

    /// Get the context provider.
    fn context(&self) -> &Self::Context;

    /// Short host name, printed in the log header
    fn name(&self) -> &'static str;

    /// Look up a helper by ID.
    fn lookup_helper(&self, func_id: u32) -> Option<&HelperDef> {
        self.helper().lookup(func_id)
    }

    /// Look up a map by ID.
    fn lookup_map(&self, map_id: u32) -> Option<&MapDef> {
        self.map().get(map_id)
    }

    /// Look up an object type by ID.
    fn lookup_type(&self, type_id: u32) -> Option<&TypeDef> {
        self.types().lookup(type_id)
    }

    /// Get the context size.
    fn ctx_size(&self) -> u32 {
        self.context().ctx_size()
    }
}

/// A no-op platform for testing.
///
/// No helpers, no maps, no object types and an empty context. Programs that
/// only compute on registers and the stack verify against it.
#[derive(Clone, Default)]
pub struct NullPlatform;

/// Empty helper provider
#[derive(Clone, Default)]
pub struct NullHelperProvider;

impl HelperProvider for NullHelperProvider {
    fn lookup(&self, _func_id: u32) -> Option<&HelperDef> {
        None
    }

    fn count(&self) -> usize {
        0
    }

    fn iter(&self) -> impl Iterator<Item = &HelperDef> {
        core::iter::empty()
    }
}

/// Empty map provider
#[derive(Clone, Default)]
pub struct NullMapProvider;

impl MapProvider for NullMapProvider {
    fn get(&self, _map_id: u32) -> Option<&MapDef> {
        None
    }

    fn iter(&self) -> impl Iterator<Item = &MapDef> {
        core::iter::empty()
    }
}

/// Empty object type provider
#[derive(Clone, Default)]
pub struct NullTypeProvider;

impl TypeProvider for NullTypeProvider {
    fn lookup(&self, _type_id: u32) -> Option<&TypeDef> {
        None
    }

    fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        core::iter::empty()
    }
}

/// Empty context provider
#[derive(Clone, Default)]
pub struct NullContextProvider;

impl ContextProvider for NullContextProvider {
    fn ctx_size(&self) -> u32 {
        0
    }

    fn fields(&self) -> &[CtxField] {
        &[]
    }
}

impl PlatformSpec for NullPlatform {
    type Helper = NullHelperProvider;
    type Map = NullMapProvider;
    type Types = NullTypeProvider;
    type Context = NullContextProvider;

    fn helper(&self) -> &Self::Helper {
        static INSTANCE: NullHelperProvider = NullHelperProvider;
        &INSTANCE
    }

    fn map(&self) -> &Self::Map {
        static INSTANCE: NullMapProvider = NullMapProvider;
        &INSTANCE
    }

    fn types(&self) -> &Self::Types {
        static INSTANCE: NullTypeProvider = NullTypeProvider;
        &INSTANCE
    }

    fn context(&self) -> &Self::Context {
        static INSTANCE: NullContextProvider = NullContextProvider;
        &INSTANCE
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
