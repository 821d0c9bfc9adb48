use mjfit_multijet::{Axis, MjfitError, Profile, ProfileBin};

fn profile(edges: Vec<f64>, bins: &[(f64, f64, f64)]) -> Profile {
    let bins = bins
        .iter()
        .map(|&(mean, entries, error)| ProfileBin {
            mean,
            entries,
            error,
        })
        .collect();
    Profile::new(Axis::new(edges).unwrap(), bins).unwrap()
}

#[test]
fn merged_bins_pool_means_and_spreads() {
    let source = profile(
        vec![0.0, 1.0, 2.0, 3.0, 4.0],
        &[(1.0, 4.0, 0.5), (3.0, 4.0, 0.5), (2.0, 9.0, 0.0), (0.0, 0.0, 0.0)],
    );
    let rebinned = source
        .rebin_aligned(&Axis::new(vec![0.0, 2.0, 4.0]).unwrap())
        .unwrap();

    // Each source bin has a spread of 0.5^2 * 4 = 1; the means differ by 2.
    let first = rebinned.bin(0);
    assert_eq!(first.entries, 8.0);
    assert!((first.mean - 2.0).abs() < 1e-12);
    assert!((first.error - (2.0f64 / 8.0).sqrt()).abs() < 1e-12);

    // Empty source bins do not contribute.
    let second = rebinned.bin(1);
    assert_eq!(second.entries, 9.0);
    assert!((second.mean - 2.0).abs() < 1e-12);
    assert_eq!(second.error, 0.0);
}

#[test]
fn target_bins_outside_the_source_are_empty() {
    let source = profile(vec![10.0, 20.0, 30.0], &[(1.0, 2.0, 0.1), (1.2, 2.0, 0.1)]);
    let rebinned = source
        .rebin_aligned(&Axis::new(vec![20.0, 30.0, 50.0]).unwrap())
        .unwrap();
    assert_eq!(rebinned.mean(0), 1.2);
    assert_eq!(*rebinned.bin(1), ProfileBin::EMPTY);
}

#[test]
fn unaligned_target_edges_are_rejected() {
    let source = profile(vec![10.0, 20.0, 30.0], &[(1.0, 2.0, 0.1), (1.2, 2.0, 0.1)]);
    let err = source
        .rebin_aligned(&Axis::new(vec![10.0, 25.0, 30.0]).unwrap())
        .unwrap_err();
    assert!(matches!(err, MjfitError::Input(_)));
    assert_eq!(err.code(), "unaligned-binning");
}
