// SPDX-License-Identifier: GPL-2.0

//! Tests for end-to-end accept/reject scenarios
//!
//! Each program here is a small but complete unit: a bounded map index, the
//! same index without its bounds check, a loop that never converges and a
//! handle released on only one arm.

use vm_verifier::prelude::*;

const MAP_ID: u32 = 1;
const RINGBUF_ID: u32 = 2;
const VALUE_SIZE: u32 = 64;

fn platform() -> HostPlatform {
    HostPlatform::new()
        .with_map(MapDef::array(MAP_ID, VALUE_SIZE, 16))
        .with_map(MapDef::ringbuf(RINGBUF_ID, 4096))
}

fn verify(insns: Vec<Insn>, config: VerifierConfig) -> VerifierOutput {
    verify_program(platform(), insns, config)
}

fn exit() -> Insn {
    Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0)
}

/// Look up key 0 of the array map, then index the value with `len & 0xff`.
/// With `bounded`, the index is first checked against the value size.
fn map_index_program(bounded: bool) -> Vec<Insn> {
    let skip = if bounded { 5 } else { 4 };
    let mut insns = vec![
        // r6 = r1 (ctx)
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 6, 1, 0, 0),
        // *(u32 *)(r10 - 4) = 0
        Insn::new(VM_ST | VM_MEM | VM_W, 10, 0, -4, 0),
        // r2 = r10
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 2, 10, 0, 0),
        // r2 += -4
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 2, 0, 0, -4),
    ];
    // r1 = map[1]
    insns.extend(Insn::ld_map(1, MAP_ID));
    insns.extend([
        // call map_lookup_elem
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::MAP_LOOKUP_ELEM as i32),
        // if r0 == 0 goto out
        Insn::new(VM_JMP | VM_JEQ | VM_K, 0, 0, skip, 0),
        // r1 = *(u32 *)(r6 + 8)  (ctx->len)
        Insn::new(VM_LDX | VM_MEM | VM_W, 1, 6, 8, 0),
        // r1 &= 0xff
        Insn::new(VM_ALU64 | VM_AND | VM_K, 1, 0, 0, 0xff),
    ]);
    if bounded {
        // if r1 >= 64 goto out
        insns.push(Insn::new(VM_JMP | VM_JGE | VM_K, 1, 0, 2, VALUE_SIZE as i32));
    }
    insns.extend([
        // r0 += r1
        Insn::new(VM_ALU64 | VM_ADD | VM_X, 0, 1, 0, 0),
        // r1 = *(u8 *)(r0 + 0)
        Insn::new(VM_LDX | VM_MEM | VM_B, 1, 0, 0, 0),
        // out: r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        exit(),
    ]);
    insns
}

#[test]
fn test_bounded_map_index_accepted() {
    let output = verify(map_index_program(true), VerifierConfig::default());
    assert!(output.outcome.is_success(), "{}\n{}", output.outcome, output.log);
}

#[test]
fn test_unbounded_map_index_rejected() {
    let insns = map_index_program(false);
    let load_idx = insns.len() - 3;
    let output = verify(insns, VerifierConfig::default());
    let failure = output.outcome.failure().expect("must be rejected");
    assert!(output.outcome.is_failure());
    assert_eq!(failure.error.kind(), ErrorKind::InvalidAccess);
    assert_eq!(failure.insn_idx, load_idx);
}

#[test]
fn test_unbounded_index_rejected_in_privileged_mode_too() {
    let output = verify(map_index_program(false), VerifierConfig::privileged());
    assert_eq!(output.outcome.error_kind(), Some(ErrorKind::InvalidAccess));
}

/// Index the map value with `ctx->ifindex`, checked against `ctx->len & mask`
/// held in another register. With `via_copy`, the index is copied before the
/// check and the copy does the indexing.
fn len_compare_program(mask: i32, compare: bool, via_copy: bool) -> Vec<Insn> {
    let idx_reg = if via_copy { 3 } else { 1 };
    let mut insns = vec![
        // r6 = r1 (ctx)
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 6, 1, 0, 0),
        // *(u32 *)(r10 - 4) = 0
        Insn::new(VM_ST | VM_MEM | VM_W, 10, 0, -4, 0),
        // r2 = r10
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 2, 10, 0, 0),
        // r2 += -4
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 2, 0, 0, -4),
    ];
    // r1 = map[1]
    insns.extend(Insn::ld_map(1, MAP_ID));
    insns.extend([
        // call map_lookup_elem
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::MAP_LOOKUP_ELEM as i32),
        // if r0 == 0 goto out, patched below
        Insn::new(VM_JMP | VM_JEQ | VM_K, 0, 0, 0, 0),
        // r7 = *(u32 *)(r6 + 8)  (ctx->len)
        Insn::new(VM_LDX | VM_MEM | VM_W, 7, 6, 8, 0),
        // r7 &= mask
        Insn::new(VM_ALU64 | VM_AND | VM_K, 7, 0, 0, mask),
        // r1 = *(u32 *)(r6 + 16)  (ctx->ifindex)
        Insn::new(VM_LDX | VM_MEM | VM_W, 1, 6, 16, 0),
    ]);
    let null_check = 7;
    if via_copy {
        // r3 = r1
        insns.push(Insn::new(VM_ALU64 | VM_MOV | VM_X, 3, 1, 0, 0));
    }
    if compare {
        // if r1 >= r7 goto out
        insns.push(Insn::new(VM_JMP | VM_JGE | VM_X, 1, 7, 2, 0));
    }
    insns.extend([
        // r0 += idx
        Insn::new(VM_ALU64 | VM_ADD | VM_X, 0, idx_reg, 0, 0),
        // r1 = *(u8 *)(r0 + 0)
        Insn::new(VM_LDX | VM_MEM | VM_B, 1, 0, 0, 0),
        // out: r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        exit(),
    ]);
    let out = insns.len() - 2;
    insns[null_check].off = (out - null_check - 1) as i16;
    insns
}

#[test]
fn test_index_checked_against_length_register() {
    let output = verify(len_compare_program(63, true, false), VerifierConfig::default());
    assert!(output.outcome.is_success(), "{}\n{}", output.outcome, output.log);

    // the bound reaches a copy made before the check
    let output = verify(len_compare_program(63, true, true), VerifierConfig::default());
    assert!(output.outcome.is_success(), "{}\n{}", output.outcome, output.log);
}

#[test]
fn test_length_register_larger_than_value_rejected() {
    let insns = len_compare_program(127, true, false);
    let load_idx = insns.len() - 3;
    let output = verify(insns, VerifierConfig::default());
    let failure = output.outcome.failure().expect("must be rejected");
    assert_eq!(failure.error.kind(), ErrorKind::InvalidAccess);
    assert_eq!(failure.insn_idx, load_idx);
}

#[test]
fn test_length_register_without_check_rejected() {
    let insns = len_compare_program(63, false, false);
    let load_idx = insns.len() - 3;
    let output = verify(insns, VerifierConfig::default());
    let failure = output.outcome.failure().expect("must be rejected");
    assert_eq!(failure.error.kind(), ErrorKind::InvalidAccess);
    assert_eq!(failure.insn_idx, load_idx);
}

#[test]
fn test_offset_copy_of_checked_index_rejected() {
    let mut insns = len_compare_program(63, true, true);
    // r3 += 100 after the check
    let add_idx = insns.len() - 4;
    insns.insert(add_idx, Insn::new(VM_ALU64 | VM_ADD | VM_K, 3, 0, 0, 100));
    // both jumps to out now skip one more insn
    insns[7].off += 1;
    insns[add_idx - 1].off += 1;
    let load_idx = insns.len() - 3;
    let output = verify(insns, VerifierConfig::default());
    let failure = output.outcome.failure().expect("must be rejected");
    assert_eq!(failure.error.kind(), ErrorKind::InvalidAccess);
    assert_eq!(failure.insn_idx, load_idx);
}

#[test]
fn test_non_converging_loop_exhausts_budget() {
    let insns = vec![
        // r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        // loop: r0 += 1
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 0, 0, 0, 1),
        // if r0 != 0 goto loop
        Insn::new(VM_JMP | VM_JNE | VM_K, 0, 0, -2, 0),
        exit(),
    ];
    let budget = 1000;
    let output = verify(insns, VerifierConfig::default().with_insn_budget(budget));
    let VerificationOutcome::Aborted(info) = &output.outcome else {
        panic!("expected abort: {}", output.outcome);
    };
    assert_eq!(info.reason, AbortReason::InsnBudget);
    assert_eq!(info.failure.error.kind(), ErrorKind::TooComplex);
    assert_eq!(info.stats.insns_processed, budget);
}

#[test]
fn test_release_on_one_arm_only() {
    let mut insns = Vec::new();
    // r1 = map[2]
    insns.extend(Insn::ld_map(1, RINGBUF_ID));
    insns.extend([
        // r2 = 8
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 2, 0, 0, 8),
        // r3 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 3, 0, 0, 0),
        // call ringbuf_reserve
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::RINGBUF_RESERVE as i32),
        // if r0 != 0 goto have
        Insn::new(VM_JMP | VM_JNE | VM_K, 0, 0, 2, 0),
        // r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        exit(),
        // have: r6 = r0
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 6, 0, 0, 0),
        // call get_prandom_u32
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::GET_PRANDOM_U32 as i32),
        // if r0 > 10 goto skip
        Insn::new(VM_JMP | VM_JGT | VM_K, 0, 0, 5, 10),
        // r1 = r6
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 1, 6, 0, 0),
        // r2 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 2, 0, 0, 0),
        // call ringbuf_submit
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::RINGBUF_SUBMIT as i32),
        // r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        exit(),
        // skip: r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        exit(),
    ]);
    let leaking_exit = insns.len() - 1;
    let output = verify(insns, VerifierConfig::default());
    let failure = output.outcome.failure().expect("must be rejected");
    assert_eq!(failure.error.kind(), ErrorKind::UnreleasedResource);
    assert!(matches!(
        failure.error,
        VerifierError::UnreleasedReference { acquired_at: 4, .. }
    ));
    assert_eq!(failure.insn_idx, leaking_exit);
}

#[test]
fn test_release_on_both_arms_accepted() {
    let mut insns = Vec::new();
    insns.extend(Insn::ld_map(1, RINGBUF_ID));
    insns.extend([
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 2, 0, 0, 8),
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 3, 0, 0, 0),
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::RINGBUF_RESERVE as i32),
        // if r0 == 0 goto out
        Insn::new(VM_JMP | VM_JEQ | VM_K, 0, 0, 8, 0),
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 6, 0, 0, 0),
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::GET_PRANDOM_U32 as i32),
        Insn::new(VM_ALU64 | VM_MOV | VM_X, 1, 6, 0, 0),
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 2, 0, 0, 0),
        // if r0 > 10 goto discard
        Insn::new(VM_JMP | VM_JGT | VM_K, 0, 0, 2, 10),
        // call ringbuf_submit
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::RINGBUF_SUBMIT as i32),
        // goto out
        Insn::new(VM_JMP | VM_JA, 0, 0, 1, 0),
        // discard: call ringbuf_discard
        Insn::new(VM_JMP | VM_CALL, 0, 0, 0, helper_ids::RINGBUF_DISCARD as i32),
        // out: r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        exit(),
    ]);
    let output = verify(insns, VerifierConfig::default());
    assert!(output.outcome.is_success(), "{}\n{}", output.outcome, output.log);
}
