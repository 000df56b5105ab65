// SPDX-License-Identifier: GPL-2.0

//! Performance benchmarks for the verifier
//!
//! Run with: cargo bench
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vm_verifier::analysis::states_equal::{states_equal, CompareMode};
use vm_verifier::bounds::scalar::ScalarBounds;
use vm_verifier::bounds::tnum::Tnum;
use vm_verifier_core::core::insn_verify::check_structure;
use vm_verifier::prelude::*;

// ============================================================================
// Test Program Generators
// ============================================================================

/// Generate a straight-line program (no branches)
fn generate_linear_program(size: usize) -> Vec<Insn> {
    let mut insns = Vec::with_capacity(size);

    // r0 = 0
    insns.push(Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0));

    for i in 1..size.saturating_sub(1) {
        let op = match i % 4 {
            0 => VM_ADD,
            1 => VM_SUB,
            2 => VM_AND,
            _ => VM_OR,
        };
        insns.push(Insn::new(VM_ALU64 | op | VM_K, 0, 0, 0, (i % 256) as i32));
    }

    // exit
    insns.push(Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0));

    insns
}

/// Generate `depth` diamonds on fresh unknown values
fn generate_branching_program(depth: usize) -> Vec<Insn> {
    let mut insns = Vec::new();

    // r0 = 0
    insns.push(Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0));

    for i in 0..depth {
        // r2 = *(u32 *)(r1 + 8)
        insns.push(Insn::new(VM_LDX | VM_MEM | VM_W, 2, 1, 8, 0));
        // if r2 > i goto +1
        insns.push(Insn::new(VM_JMP | VM_JGT | VM_K, 2, 0, 1, i as i32));
        // r3 = i (dead at the merge point)
        insns.push(Insn::new(VM_ALU64 | VM_MOV | VM_K, 3, 0, 0, i as i32));
    }

    // exit
    insns.push(Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0));

    insns
}

/// Generate a counting loop
fn generate_loop_program(iterations: usize) -> Vec<Insn> {
    vec![
        // r0 = 0
        Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
        // loop: r0 += 1
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 0, 0, 0, 1),
        // if r0 < iterations goto loop
        Insn::new(VM_JMP | VM_JLT | VM_K, 0, 0, -2, iterations as i32),
        // exit
        Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0),
    ]
}

/// Generate a chain of nested subprogram calls
fn generate_call_program(call_depth: usize) -> Vec<Insn> {
    let mut insns = Vec::new();

    for level in 0..call_depth {
        // call the next level, right after this function's exit
        insns.push(Insn::new(VM_JMP | VM_CALL, 0, VM_PSEUDO_CALL, 0, 2));
        // r0 += level
        insns.push(Insn::new(VM_ALU64 | VM_ADD | VM_K, 0, 0, 0, level as i32));
        insns.push(Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0));
    }

    // innermost: r0 = 0
    insns.push(Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0));
    insns.push(Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0));

    insns
}

/// Generate stack spills and fills
fn generate_memory_program(accesses: usize) -> Vec<Insn> {
    let mut insns = Vec::new();

    // r0 = 0
    insns.push(Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0));

    for i in 0..accesses {
        let offset = -((i % 64) as i16 + 1) * 8;

        if i % 2 == 0 {
            // *(u64 *)(r10 + offset) = r0
            insns.push(Insn::new(VM_STX | VM_MEM | VM_DW, 10, 0, offset, 0));
        } else {
            // r0 = *(u64 *)(r10 + offset + 8), stored one step earlier
            insns.push(Insn::new(VM_LDX | VM_MEM | VM_DW, 0, 10, offset + 8, 0));
        }
    }

    // exit
    insns.push(Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0));

    insns
}

fn run(insns: &[Insn], config: &VerifierConfig) -> VerificationOutcome {
    let platform = HostPlatform::new().with_map(MapDef::array(1, 64, 16));
    verify_program(platform, insns.to_vec(), config.clone()).outcome
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Benchmark the structural pass alone
fn bench_structure(c: &mut Criterion) {
    let mut group = c.benchmark_group("structure");

    for size in [100, 1000, 10000].iter() {
        let insns = generate_linear_program(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &insns, |b, insns| {
            b.iter(|| check_structure(black_box(insns), usize::MAX, |_| true));
        });
    }

    group.finish();
}

/// Benchmark straight-line verification
fn bench_linear_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_programs");
    let config = VerifierConfig::default();

    for size in [100, 1000, 10000].iter() {
        let insns = generate_linear_program(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &insns, |b, insns| {
            b.iter(|| run(black_box(insns), &config));
        });
    }

    group.finish();
}

/// Benchmark branching programs with and without pruning
fn bench_branching_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("branching_programs");

    for depth in [4, 8, 12].iter() {
        let insns = generate_branching_program(*depth);
        group.throughput(Throughput::Elements(insns.len() as u64));

        let pruned = VerifierConfig::default();
        group.bench_with_input(BenchmarkId::new("pruned", depth), &insns, |b, insns| {
            b.iter(|| run(black_box(insns), &pruned));
        });

        let unpruned = VerifierConfig::default().with_prune(false);
        group.bench_with_input(BenchmarkId::new("unpruned", depth), &insns, |b, insns| {
            b.iter(|| run(black_box(insns), &unpruned));
        });
    }

    group.finish();
}

/// Benchmark loop programs
fn bench_loop_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_programs");
    let config = VerifierConfig::privileged();

    for iterations in [10, 100, 1000].iter() {
        let insns = generate_loop_program(*iterations);

        group.throughput(Throughput::Elements(*iterations as u64));
        group.bench_with_input(BenchmarkId::from_parameter(iterations), &insns, |b, insns| {
            b.iter(|| run(black_box(insns), &config));
        });
    }

    group.finish();
}

/// Benchmark call chains
fn bench_call_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_programs");
    let config = VerifierConfig::default();

    for depth in [1, 4, 7].iter() {
        let insns = generate_call_program(*depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &insns, |b, insns| {
            b.iter(|| run(black_box(insns), &config));
        });
    }

    group.finish();
}

/// Benchmark stack-heavy programs
fn bench_memory_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_programs");
    let config = VerifierConfig::default();

    for accesses in [10, 100, 500].iter() {
        let insns = generate_memory_program(*accesses);

        group.throughput(Throughput::Elements(*accesses as u64));
        group.bench_with_input(BenchmarkId::from_parameter(accesses), &insns, |b, insns| {
            b.iter(|| run(black_box(insns), &config));
        });
    }

    group.finish();
}

/// Benchmark state cloning and comparison
fn bench_state_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_operations");

    group.bench_function("state_new", |b| {
        b.iter(|| black_box(VerifierState::new_entry()));
    });

    let state = VerifierState::new_entry();
    group.bench_function("state_clone", |b| {
        b.iter(|| black_box(state.clone()));
    });

    let other = state.clone();
    group.bench_function("states_equal_exact", |b| {
        b.iter(|| states_equal(black_box(&state), black_box(&other), CompareMode::Exact));
    });
    group.bench_function("states_equal_covered", |b| {
        b.iter(|| states_equal(black_box(&state), black_box(&other), CompareMode::Covered));
    });

    group.finish();
}

/// Benchmark the value domain
fn bench_bounds_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounds_operations");

    let t1 = Tnum::const_value(0x12345678);
    let t2 = Tnum::range(0, 0xff);
    group.bench_function("tnum_add", |b| {
        b.iter(|| black_box(t1.add(black_box(t2))));
    });
    group.bench_function("tnum_mul", |b| {
        b.iter(|| black_box(t1.mul(black_box(t2))));
    });

    let a = ScalarBounds::from_urange(0, 1000);
    let k = ScalarBounds::constant(7);
    group.bench_function("scalar_add", |b| {
        b.iter(|| black_box(a.add(black_box(&k))));
    });
    group.bench_function("scalar_mul", |b| {
        b.iter(|| black_box(a.mul(black_box(&k))));
    });
    group.bench_function("scalar_sext32", |b| {
        b.iter(|| black_box(black_box(&a).sext32()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_structure,
    bench_linear_programs,
    bench_branching_programs,
    bench_loop_programs,
    bench_call_programs,
    bench_memory_programs,
    bench_state_operations,
    bench_bounds_operations,
);
criterion_main!(benches);
