use mjfit_multijet::{Axis, AxisPosition, Hist2D, MjfitError};

#[test]
fn bins_include_their_lower_edge() {
    let axis = Axis::new(vec![10.0, 20.0, 40.0]).unwrap();
    assert_eq!(axis.find(9.999), AxisPosition::Underflow);
    assert_eq!(axis.find(10.0), AxisPosition::Bin(0));
    assert_eq!(axis.find(20.0), AxisPosition::Bin(1));
    assert_eq!(axis.find(39.9), AxisPosition::Bin(1));
    assert_eq!(axis.find(40.0), AxisPosition::Overflow);
    assert_eq!((axis.low_edge(1), axis.up_edge(1)), (20.0, 40.0));
    assert_eq!(axis.center(1), 30.0);
    assert_eq!(axis.width(1), 20.0);
}

#[test]
fn uniform_axis_spans_the_range() {
    let axis = Axis::uniform(4, 0.0, 2.0).unwrap();
    assert_eq!(axis.edges(), [0.0, 0.5, 1.0, 1.5, 2.0]);
    assert!(axis.same_binning(&Axis::new(vec![0.0, 0.5, 1.0, 1.5, 2.0 + 1e-12]).unwrap()));
    assert!(Axis::uniform(0, 0.0, 1.0).is_err());
}

#[test]
fn invalid_edges_are_binning_errors() {
    for edges in [vec![1.0], vec![0.0, f64::NAN], vec![0.0, 2.0, 1.0]] {
        let err = Axis::new(edges).unwrap_err();
        assert!(matches!(err, MjfitError::Binning(_)));
    }
}

#[test]
fn hist2d_rows_are_x_major() {
    let x = Axis::new(vec![0.0, 1.0, 2.0]).unwrap();
    let y = Axis::new(vec![0.0, 10.0, 20.0, 30.0]).unwrap();
    let hist = Hist2D::from_rows(x, y, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
    assert_eq!(hist.row(1), [4.0, 5.0, 6.0]);
    assert_eq!(hist.content(0, 2), 3.0);
}
