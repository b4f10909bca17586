//! Benchmarks for resonator fitting
//!
//! Tests performance of the least-squares engine through the fitter.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use num_complex::Complex64;
use resonator_core::background::One;
use resonator_core::fitting::Solver;
use resonator_core::{FitOptions, Parameter, Parameters, TLCircuit, TLResonatorFitter};

fn test_circuit() -> TLCircuit {
    TLCircuit {
        rl: 50.0,
        cc: 1e-14,
        ls: 4e-7,
        rs: 1000.0,
        cs: 1.6e-10,
        gs: 1e-4,
        imp_load: Complex64::new(0.0, 0.0),
        length: 4e-3,
    }
}

/// Start near the generating circuit with the line constants free
fn initial_params(circuit: &TLCircuit) -> Parameters {
    let free = [
        ("Rl", circuit.rl),
        ("Cc", circuit.cc),
        ("Ls", circuit.ls),
        ("Rs", circuit.rs),
        ("Cs", circuit.cs),
    ];
    let fixed = [
        ("Gs", circuit.gs),
        ("imp_load", circuit.imp_load.re),
        ("length", circuit.length),
    ];

    let mut params = Parameters::new();
    for (name, value) in free {
        params.insert(
            Parameter::new(name, value * 1.05)
                .with_bounds(0.5 * value, 2.0 * value)
                .unwrap(),
        );
    }
    for (name, value) in fixed {
        params.insert(Parameter::new(name, value).fixed());
    }
    params
}

fn bench_refit(c: &mut Criterion) {
    let mut group = c.benchmark_group("tl_resonator_refit");
    group.sample_size(10);

    let circuit = test_circuit();
    for solver in [Solver::LevenbergMarquardt, Solver::GaussNewton] {
        for nfreq in [101, 401].iter() {
            let f = Array1::linspace(5e9, 11e9, *nfreq);
            let data = circuit.impedance_array(f.as_slice().unwrap());
            let options = FitOptions::default().with_solver(solver);
            let mut fitter =
                TLResonatorFitter::new(f, data, Some(Box::new(One)), None, options).unwrap();

            let id = BenchmarkId::new(format!("{:?}", solver), nfreq);
            group.bench_with_input(id, nfreq, |b, _| {
                b.iter(|| black_box(fitter.fit(Some(initial_params(&circuit))).is_ok()))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_refit);
criterion_main!(benches);
