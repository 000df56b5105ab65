// SPDX-License-Identifier: GPL-2.0

//! Tests for subprogram calls
//!
//! Argument passing, return values, callee-saved registers, depth and
//! recursion limits and the combined stack budget of a call chain.

use vm_verifier::prelude::*;

fn verify(insns: Vec<Insn>, config: VerifierConfig) -> VerificationOutcome {
    verify_program(HostPlatform::new(), insns, config).outcome
}

/// Pseudo call at `idx` to the function starting at `target`
fn call(idx: usize, target: usize) -> Insn {
    Insn::new(VM_JMP | VM_CALL, 0, VM_PSEUDO_CALL, 0, (target as i64 - idx as i64 - 1) as i32)
}

fn mov_imm(dst: u8, imm: i32) -> Insn {
    Insn::new(VM_ALU64 | VM_MOV | VM_K, dst, 0, 0, imm)
}

fn mov_reg(dst: u8, src: u8) -> Insn {
    Insn::new(VM_ALU64 | VM_MOV | VM_X, dst, src, 0, 0)
}

fn exit() -> Insn {
    Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0)
}

/// `n` nested calls, one function per level
fn call_chain(n: usize) -> Vec<Insn> {
    let mut insns = Vec::new();
    for level in 0..n {
        let idx = 2 * level;
        insns.push(call(idx, idx + 2));
        insns.push(exit());
    }
    insns.push(mov_imm(0, 0));
    insns.push(exit());
    insns
}

#[test]
fn test_call_and_return_value() {
    let insns = vec![
        // r1 = 5
        mov_imm(1, 5),
        // call add_one
        call(1, 3),
        exit(),
        // add_one: r0 = r1
        mov_reg(0, 1),
        // r0 += 1
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 0, 0, 0, 1),
        exit(),
    ];
    let VerificationOutcome::Success(info) = verify(insns, VerifierConfig::default()) else {
        panic!("expected success");
    };
    assert_eq!(info.stack_depths.len(), 2);
    assert_eq!(info.stats.max_call_depth, 2);
}

#[test]
fn test_callee_writes_caller_stack() {
    let insns = vec![
        // r1 = r10
        mov_reg(1, 10),
        // r1 += -8
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 1, 0, 0, -8),
        // call fill
        call(2, 5),
        // r0 = *(u64 *)(r10 - 8)
        Insn::new(VM_LDX | VM_MEM | VM_DW, 0, 10, -8, 0),
        exit(),
        // fill: *(u64 *)(r1 + 0) = 7
        Insn::new(VM_ST | VM_MEM | VM_DW, 1, 0, 0, 7),
        mov_imm(0, 0),
        exit(),
    ];
    let outcome = verify(insns, VerifierConfig::default());
    assert!(outcome.is_success(), "{}", outcome);
}

#[test]
fn test_caller_saved_registers_clobbered() {
    let insns = vec![
        mov_imm(1, 1),
        mov_imm(6, 6),
        call(2, 5),
        // r0 = r1 after the call
        mov_reg(0, 1),
        exit(),
        mov_imm(0, 0),
        exit(),
    ];
    let outcome = verify(insns.clone(), VerifierConfig::default());
    assert_eq!(outcome.error(), Some(&VerifierError::UninitializedRegister(1)));
    assert_eq!(outcome.failure().unwrap().insn_idx, 3);

    // r6 survives, even though the callee writes its own r6
    let mut insns = insns;
    insns[3] = mov_reg(0, 6);
    insns[5] = mov_imm(6, 0);
    insns.insert(6, mov_imm(0, 0));
    let outcome = verify(insns, VerifierConfig::default());
    assert!(outcome.is_success(), "{}", outcome);
}

#[test]
fn test_callee_cannot_read_caller_callee_saved() {
    let insns = vec![
        mov_imm(6, 6),
        call(1, 3),
        exit(),
        // r0 = r6 inside the callee
        mov_reg(0, 6),
        exit(),
    ];
    let outcome = verify(insns, VerifierConfig::default());
    assert_eq!(outcome.error(), Some(&VerifierError::UninitializedRegister(6)));
    assert_eq!(outcome.failure().unwrap().insn_idx, 3);
}

#[test]
fn test_return_of_own_stack_pointer() {
    let insns = vec![
        call(0, 2),
        exit(),
        // r0 = r10
        mov_reg(0, 10),
        // r0 += -8
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 0, 0, 0, -8),
        exit(),
    ];
    let outcome = verify(insns, VerifierConfig::privileged());
    assert!(matches!(outcome.error(), Some(VerifierError::InvalidReturn(_))));
    assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidCall));
}

#[test]
fn test_recursion_rejected() {
    let insns = vec![call(0, 2), exit(), call(2, 2), exit()];
    let outcome = verify(insns, VerifierConfig::default());
    assert_eq!(outcome.error(), Some(&VerifierError::RecursiveCall(2)));
    assert_eq!(outcome.failure().unwrap().insn_idx, 2);
}

#[test]
fn test_call_depth_limit() {
    let VerificationOutcome::Success(info) = verify(call_chain(7), VerifierConfig::default())
    else {
        panic!("seven nested calls fit in eight frames");
    };
    assert_eq!(info.stats.max_call_depth, 8);

    let outcome = verify(call_chain(8), VerifierConfig::default());
    assert_eq!(outcome.error(), Some(&VerifierError::CallStackOverflow(9)));
    assert_eq!(outcome.failure().unwrap().insn_idx, 14);
}

#[test]
fn test_configured_call_depth() {
    let config = VerifierConfig::default().with_max_call_depth(2);
    assert!(verify(call_chain(1), config.clone()).is_success());
    assert_eq!(
        verify(call_chain(2), config).error_kind(),
        Some(ErrorKind::InvalidCall)
    );
}

#[test]
fn test_combined_stack_budget() {
    let insns = vec![
        // *(u64 *)(r10 - 304) = 0
        Insn::new(VM_ST | VM_MEM | VM_DW, 10, 0, -304, 0),
        call(1, 3),
        exit(),
        // *(u64 *)(r10 - 256) = 0 inside the callee
        Insn::new(VM_ST | VM_MEM | VM_DW, 10, 0, -256, 0),
        mov_imm(0, 0),
        exit(),
    ];
    let outcome = verify(insns.clone(), VerifierConfig::default());
    assert_eq!(
        outcome.error(),
        Some(&VerifierError::StackBudgetExceeded {
            depth: 560,
            budget: 512
        })
    );
    assert_eq!(outcome.failure().unwrap().insn_idx, 3);

    let VerificationOutcome::Success(info) =
        verify(insns, VerifierConfig::default().with_stack_budget(1024))
    else {
        panic!("fits in a larger budget");
    };
    assert_eq!(info.stack_depths, vec![304, 256]);
}
