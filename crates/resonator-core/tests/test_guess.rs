//! Integration tests for initial parameter guesses

use num_complex::Complex64;
use resonator_core::background::{Magnitude, MagnitudePhase, MagnitudePhaseDelay, One};
use resonator_core::{CompositeModel, Model, TLResonator};

#[test]
fn test_resonator_guess_within_bounds() {
    let params = TLResonator.guess(&[], &[]).unwrap();
    assert_eq!(params.len(), 8);

    for p in params.iter() {
        assert!(
            p.min() <= p.value() && p.value() <= p.max(),
            "{} outside its bounds",
            p
        );
    }
}

#[test]
fn test_resonator_guess_table() {
    let params = TLResonator.guess(&[], &[]).unwrap();

    let rl = params.get("Rl").unwrap();
    assert_eq!((rl.value(), rl.min(), rl.max()), (50.0, 0.0, 100.0));
    let cc = params.get("Cc").unwrap();
    assert_eq!((cc.value(), cc.min(), cc.max()), (10e-12, 0.5e-12, 100e-12));
    let length = params.get("length").unwrap();
    assert_eq!(length.value(), 4000e-6);
    assert_eq!((length.min(), length.max()), (2525e-6, 6755e-6));

    for name in ["Rs", "Gs"] {
        let p = params.get(name).unwrap();
        assert_eq!(p.value(), 1.0);
        assert!(p.min().is_infinite() && p.max().is_infinite());
    }
}

#[test]
fn test_load_impedance_is_fixed() {
    let params = TLResonator.guess(&[], &[]).unwrap();
    let imp_load = params.get("imp_load").unwrap();
    assert!(!imp_load.vary());
    assert_eq!(imp_load.value(), 0.0);
    assert!(params.varying().all(|p| p.name() != "imp_load"));
}

#[test]
fn test_guess_ignores_data() {
    let freqs = [1e9, 2e9, 3e9];
    let a = TLResonator.guess(&[Complex64::new(1.0, 0.0); 3], &freqs).unwrap();
    let b = TLResonator.guess(&[Complex64::new(-7.0, 3.0); 3], &freqs).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_composite_guess_includes_every_background() {
    let data = [Complex64::new(0.0, 2.0); 4];
    let freqs = [1e9, 2e9, 3e9, 4e9];

    let backgrounds: Vec<(Box<dyn Model>, usize)> = vec![
        (Box::new(One), 8),
        (Box::new(Magnitude), 9),
        (Box::new(MagnitudePhase), 10),
        (Box::new(MagnitudePhaseDelay), 11),
    ];
    for (background, expected) in backgrounds {
        let model = CompositeModel::new(background, TLResonator).unwrap();
        let params = model.guess(&data, &freqs).unwrap();
        assert_eq!(params.len(), expected);
    }
}
