// SPDX-License-Identifier: GPL-2.0

//! Tests for reference acquisition and release
//!
//! Socket lookups and ring buffer reservations hand out references that
//! every path must give back exactly once.

use vm_verifier::prelude::*;

fn verify(insns: Vec<Insn>, config: VerifierConfig) -> VerificationOutcome {
    let platform = HostPlatform::new().with_map(MapDef::ringbuf(2, 4096));
    verify_program(platform, insns, config).outcome
}

fn call(id: u32) -> Insn {
    Insn::new(VM_JMP | VM_CALL, 0, 0, 0, id as i32)
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

/// Instructions 0..=6: build an 8-byte tuple on the stack and look up a socket
fn socket_lookup() -> Vec<Insn> {
    vec![
        // *(u64 *)(r10 - 8) = 0
        Insn::new(VM_ST | VM_MEM | VM_DW, 10, 0, -8, 0),
        // r2 = r10
        mov_reg(2, 10),
        // r2 += -8
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 2, 0, 0, -8),
        // r3 = 8
        mov_imm(3, 8),
        // r4 = 0
        mov_imm(4, 0),
        // r5 = 0
        mov_imm(5, 0),
        // call sk_lookup_tcp
        call(helper_ids::SK_LOOKUP_TCP),
    ]
}

#[test]
fn test_socket_lookup_and_release() {
    let mut insns = socket_lookup();
    insns.extend([
        // if r0 == 0 goto out
        Insn::new(VM_JMP | VM_JEQ | VM_K, 0, 0, 2, 0),
        // r1 = r0
        mov_reg(1, 0),
        // call sk_release
        call(helper_ids::SK_RELEASE),
        // out: r0 = 0
        mov_imm(0, 0),
        exit(),
    ]);
    let VerificationOutcome::Success(info) = verify(insns, VerifierConfig::default()) else {
        panic!("expected success");
    };
    assert_eq!(info.stats.helper_calls, 2);
}

#[test]
fn test_socket_leak() {
    let mut insns = socket_lookup();
    insns.extend([mov_imm(0, 0), exit()]);
    let outcome = verify(insns, VerifierConfig::default());
    let failure = outcome.failure().expect("must be rejected");
    assert!(matches!(
        failure.error,
        VerifierError::UnreleasedReference { acquired_at: 6, .. }
    ));
    assert_eq!(failure.insn_idx, 8);
}

#[test]
fn test_socket_leak_is_rejected_when_privileged() {
    let mut insns = socket_lookup();
    insns.extend([mov_imm(0, 0), exit()]);
    let outcome = verify(insns, VerifierConfig::privileged());
    assert_eq!(outcome.error_kind(), Some(ErrorKind::UnreleasedResource));
}

#[test]
fn test_release_requires_null_check() {
    let mut insns = socket_lookup();
    insns.extend([
        // r1 = r0 without checking it
        mov_reg(1, 0),
        call(helper_ids::SK_RELEASE),
        mov_imm(0, 0),
        exit(),
    ]);
    let outcome = verify(insns, VerifierConfig::default());
    assert!(matches!(outcome.error(), Some(VerifierError::TypeMismatch { .. })));
    assert_eq!(outcome.failure().unwrap().insn_idx, 8);
}

#[test]
fn test_use_after_release() {
    let mut insns = socket_lookup();
    insns.extend([
        // if r0 == 0 goto out
        Insn::new(VM_JMP | VM_JEQ | VM_K, 0, 0, 4, 0),
        // r6 = r0
        mov_reg(6, 0),
        // r1 = r6
        mov_reg(1, 6),
        call(helper_ids::SK_RELEASE),
        // r1 = r6, a copy of the released socket
        mov_reg(1, 6),
        // out: r0 = 0
        mov_imm(0, 0),
        exit(),
    ]);
    let outcome = verify(insns, VerifierConfig::default());
    assert_eq!(outcome.error(), Some(&VerifierError::UninitializedRegister(6)));
    assert_eq!(outcome.failure().unwrap().insn_idx, 11);
}

#[test]
fn test_release_of_plain_scalar() {
    let insns = vec![
        mov_imm(1, 0),
        mov_imm(2, 0),
        call(helper_ids::RINGBUF_SUBMIT),
        mov_imm(0, 0),
        exit(),
    ];
    let outcome = verify(insns, VerifierConfig::default());
    assert_eq!(outcome.error_kind(), Some(ErrorKind::TypeMismatch));
}

#[test]
fn test_reservation_written_then_submitted() {
    let mut insns = Insn::ld_map(1, 2).to_vec();
    insns.extend([
        mov_imm(2, 16),
        mov_imm(3, 0),
        call(helper_ids::RINGBUF_RESERVE),
        // if r0 == 0 goto out
        Insn::new(VM_JMP | VM_JEQ | VM_K, 0, 0, 5, 0),
        // *(u64 *)(r0 + 8) = 7
        Insn::new(VM_ST | VM_MEM | VM_DW, 0, 0, 8, 7),
        // r1 = r0
        mov_reg(1, 0),
        mov_imm(2, 0),
        call(helper_ids::RINGBUF_SUBMIT),
        // goto out
        Insn::new(VM_JMP | VM_JA, 0, 0, 0, 0),
        // out: r0 = 0
        mov_imm(0, 0),
        exit(),
    ]);
    let outcome = verify(insns.clone(), VerifierConfig::default());
    assert!(outcome.is_success(), "{}", outcome);

    // one byte past the reservation
    insns[6] = Insn::new(VM_ST | VM_MEM | VM_DW, 0, 0, 9, 7);
    let outcome = verify(insns, VerifierConfig::default());
    assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidAccess));
    assert_eq!(outcome.failure().unwrap().insn_idx, 6);
}

#[test]
fn test_reserve_size_must_be_constant() {
    // r2 = *(u32 *)(r1 + 8)  (ctx->len)
    let mut insns = vec![Insn::new(VM_LDX | VM_MEM | VM_W, 2, 1, 8, 0)];
    insns.extend(Insn::ld_map(1, 2));
    insns.extend([
        mov_imm(3, 0),
        call(helper_ids::RINGBUF_RESERVE),
        mov_imm(0, 0),
        exit(),
    ]);
    let outcome = verify(insns, VerifierConfig::default());
    assert!(matches!(outcome.error(), Some(VerifierError::InvalidHelperCall(_))));
}
