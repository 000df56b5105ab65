// SPDX-License-Identifier: GPL-2.0

//! Core value kinds and constants
//!
//! This module defines the register kinds tracked by the verifier, the
//! flags that qualify them, liveness marks and the helper signature types.

use bitflags::bitflags;

// ============================================================================
// Constants
// ============================================================================

/// Number of registers (R0..R10)
pub const MAX_REG: usize = 11;

/// Frame pointer register
pub const REG_FP: usize = 10;

/// Size of a register and of one stack slot, in bytes
pub const REG_SIZE: usize = 8;

/// Hard call-depth limit
pub const MAX_CALL_FRAMES: usize = 8;

/// Default combined stack budget across a call chain
pub const DEFAULT_STACK_BUDGET: u32 = 512;

/// Largest variable offset a pointer may carry in either direction
pub const MAX_VAR_OFF: i64 = 1 << 29;

/// Largest offset a packet pointer may be proven against
pub const MAX_PACKET_OFF: u64 = 0xffff;

/// Complexity limit for the pending-work stack
pub const COMPLEXITY_LIMIT_JMP_SEQ: usize = 8192;

/// Argument registers clobbered by any call
pub const CALLER_SAVED: [usize; 6] = [0, 1, 2, 3, 4, 5];

// ============================================================================
// Register kinds
// ============================================================================

/// Map identity carried by map pointers
/// 映射指针携带的映射标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapInfo {
    /// Platform map id
    pub map_id: u32,
    /// Key size in bytes
    pub key_size: u32,
    /// Value size in bytes
    pub value_size: u32,
}

/// Register kind together with its kind-dependent payload
/// 寄存器类型及其类型相关的载荷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegType {
    /// Register is not initialized
    #[default]
    NotInit,
    /// Plain integer
    Scalar,
    /// Pointer to the program context
    PtrToCtx,
    /// Constant pointer to a map object
    ConstPtrToMap(MapInfo),
    /// Pointer into a map value
    PtrToMapValue(MapInfo),
    /// Pointer into the stack of frame `frameno`
    PtrToStack {
        /// Frame whose stack this points into
        frameno: u32,
    },
    /// Pointer into packet data, proven readable up to `range` bytes
    PtrToPacket {
        /// Verified readable bytes past the pointer's variable base
        range: u32,
    },
    /// Pointer to the end of packet data
    PtrToPacketEnd,
    /// Socket handle
    PtrToSocket,
    /// Pointer to a generic memory region
    PtrToMem {
        /// Region size in bytes
        size: u32,
    },
    /// Pointer to an opaque typed object
    PtrToObject {
        /// Platform type id
        type_id: u32,
        /// Object size in bytes
        size: u32,
    },
}

impl RegType {
    /// Check if this is a pointer kind
    pub fn is_pointer(&self) -> bool {
        !matches!(self, RegType::NotInit | RegType::Scalar)
    }

    /// Check if this kind is a scalar
    pub fn is_scalar(&self) -> bool {
        matches!(self, RegType::Scalar)
    }

    /// Check if this is a packet data pointer
    pub fn is_pkt_pointer(&self) -> bool {
        matches!(self, RegType::PtrToPacket { .. })
    }

    /// Pointer kinds that allow `ptr +/- scalar`
    pub fn allows_arithmetic(&self) -> bool {
        matches!(
            self,
            RegType::PtrToCtx
                | RegType::PtrToMapValue(_)
                | RegType::PtrToStack { .. }
                | RegType::PtrToPacket { .. }
                | RegType::PtrToMem { .. }
                | RegType::PtrToObject { .. }
        )
    }

    /// Two values have the same kind, ignoring payload
    pub fn same_kind(&self, other: &RegType) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Short human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            RegType::NotInit => "not_init",
            RegType::Scalar => "scalar",
            RegType::PtrToCtx => "ctx",
            RegType::ConstPtrToMap(_) => "map_ptr",
            RegType::PtrToMapValue(_) => "map_value",
            RegType::PtrToStack { .. } => "fp",
            RegType::PtrToPacket { .. } => "pkt",
            RegType::PtrToPacketEnd => "pkt_end",
            RegType::PtrToSocket => "sock",
            RegType::PtrToMem { .. } => "mem",
            RegType::PtrToObject { .. } => "obj",
        }
    }
}

bitflags! {
    /// Flags that qualify a pointer kind
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegFlags: u8 {
        /// Pointer may be null
        const MAYBE_NULL = 1 << 0;
        /// Memory is read-only
        const RDONLY = 1 << 1;
    }
}

bitflags! {
    /// Liveness marks on a register or stack slot
    /// 寄存器或栈槽上的活跃性标记
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Liveness: u8 {
        /// Value was read before being overwritten on some descendant path
        const READ = 1 << 0;
        /// Value was written in the owning state
        const WRITTEN = 1 << 1;
    }
}

// ============================================================================
// Helper signatures
// ============================================================================

/// Helper argument constraints
/// 辅助函数参数约束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArgType {
    /// Argument not used
    #[default]
    DontCare,
    /// Any initialized value
    Anything,
    /// Any scalar
    Scalar,
    /// Constant map pointer
    ConstMapPtr,
    /// Readable memory of the map's key size
    PtrToMapKey,
    /// Readable memory of the map's value size
    PtrToMapValue,
    /// Readable memory whose size is the next argument
    PtrToMem,
    /// Bounded non-negative size of the preceding memory argument
    ConstSize,
    /// Known constant allocation size
    ConstAllocSize,
    /// Context pointer at offset 0
    PtrToCtx,
    /// Non-null socket handle
    PtrToSocket,
    /// Non-null memory returned by an allocating helper
    PtrToAllocMem,
    /// Non-null typed object
    PtrToObject,
}

impl ArgType {
    /// Whether this argument can carry a released reference
    pub fn is_release_arg(&self) -> bool {
        matches!(
            self,
            ArgType::PtrToSocket | ArgType::PtrToAllocMem | ArgType::PtrToObject
        )
    }
}

/// Helper return kinds
/// 辅助函数返回类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetType {
    /// Unknown scalar
    #[default]
    Integer,
    /// R0 left uninitialized
    Void,
    /// Map value pointer or null
    MapValueOrNull,
    /// Socket handle or null
    SocketOrNull,
    /// Memory of the requested allocation size or null
    MemOrNull,
    /// Non-null object of a platform type
    Object(u32),
    /// Object of a platform type or null
    ObjectOrNull(u32),
}

impl RetType {
    /// Whether the returned pointer needs a null check
    pub fn may_be_null(&self) -> bool {
        matches!(
            self,
            RetType::MapValueOrNull
                | RetType::SocketOrNull
                | RetType::MemOrNull
                | RetType::ObjectOrNull(_)
        )
    }
}
