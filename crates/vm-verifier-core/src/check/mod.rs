// SPDX-License-Identifier: GPL-2.0

//! 指令检查模块
//!
//! Per-instruction transfer functions.
//!
//! 本模块包含验证器的逐指令检查逻辑：每个检查函数先验证指令在当前抽象状态下是否安全，
//! 然后再修改状态。
//!
//! Every check validates the instruction against the current abstract state
//! first and only then mutates it, so a rejected instruction leaves the state
//! exactly as it was before the instruction.
//!
//! ## 主要功能模块
//!
//! - `alu`: 算术逻辑指令 / arithmetic and pointer arithmetic
//! - `jump`: 条件跳转与分支细化 / conditional jumps and branch refinement
//! - `load_store`: 内存访问 / loads, stores and 64-bit immediates
//! - `call`: 辅助函数、子程序调用与返回 / helper calls, subprogram calls and exits

pub mod alu;
pub mod call;
pub mod jump;
pub mod load_store;

pub use alu::check_alu;
pub use call::{check_exit, check_helper_call, check_subprog_call, ExitAction};
pub use jump::{check_cond_jmp, is_branch_taken, JumpDecision};
pub use load_store::{check_ld_imm64, check_load, check_store};

use crate::analysis::liveness::mark_reg_read;
use crate::core::error::{Result, VerifierError};
use crate::core::types::MAX_VAR_OFF;
use crate::platform::PlatformSpec;
use crate::state::reg_state::RegValue;
use crate::state::verifier_state::VerifierState;
use crate::stdlib::{format, String};
use crate::verifier::env::VerifierEnv;

/// Read register `r` as a source operand
/// 读取源操作数寄存器
///
/// Fails if the register was never written on this path. The read is
/// recorded for liveness.
pub fn read_reg<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &VerifierState,
    r: u8,
) -> Result<RegValue> {
    let value = *state.reg(r as usize);
    if !value.is_init() {
        return Err(VerifierError::UninitializedRegister(r));
    }
    mark_reg_read(&mut env.arena, state, r as usize);
    Ok(value)
}

/// Unknown scalar in privileged mode, a pointer leak otherwise
pub(crate) fn leak_or_unknown<P: PlatformSpec>(env: &VerifierEnv<P>, msg: String) -> Result<RegValue> {
    if env.config.allow_ptr_leaks {
        Ok(RegValue::unknown_scalar())
    } else {
        Err(VerifierError::PointerLeak(msg))
    }
}

/// Check `size` bytes at `ptr + off` against a region of `region` bytes
/// 检查访问是否位于区域内
///
/// The variable part of `ptr` must be non-negative and bounded, and every
/// offset it admits must keep the access inside `[0, region)`.
pub(crate) fn check_region(
    ptr: &RegValue,
    regno: u8,
    off: i64,
    size: u64,
    region: u32,
    what: &str,
) -> Result<()> {
    let var = &ptr.bounds;
    if var.smin_value < 0 {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "R{} min value is negative, either use unsigned index or do a if (index >=0) check",
            regno
        )));
    }
    if var.umax_value >= MAX_VAR_OFF as u64 || size >= MAX_VAR_OFF as u64 {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "R{} unbounded memory access, make sure to bounds check any such access",
            regno
        )));
    }
    let fixed = ptr.off as i64 + off;
    let lo = fixed + var.smin_value;
    let hi = fixed + var.umax_value as i64 + size as i64;
    if lo < 0 || hi > region as i64 {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "invalid access to {}, off={} size={} region={}",
            what, lo, size, region
        )));
    }
    Ok(())
}
