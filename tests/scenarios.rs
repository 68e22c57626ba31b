mod common;

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use img2arc::junction::{intersect, max_gap, resolve_junctions};
use img2arc::kurbo::Point;
use img2arc::output::{gcode, svg};
use img2arc::trace::build_graph;
use img2arc::{
    trace_chain, trace_mask, trace_mask_with_raw, CornerKind, FitterKind, PixelChain, PixelMask,
    Segment, TracingConfig, Winding,
};

use common::*;

fn config() -> TracingConfig {
    TracingConfig::default()
}

#[test]
fn horizontal_run_is_a_single_line() {
    let mask = horizontal_run(1, 1, 5);
    let graph = build_graph(&mask);
    assert_eq!(graph.edges.len(), 1);

    let result = trace_mask(&mask, &config()).unwrap();
    assert_eq!(result.paths.len(), 1);
    let path = &result.paths[0];
    assert_eq!(path.segments.len(), 1);
    let Segment::Line(line) = &path.segments[0] else {
        panic!("expected a line, got {:?}", path.segments[0]);
    };
    assert!((line.direction.x.abs() - 1.0).abs() < 1e-9);
    assert!(line.direction.y.abs() < 1e-9);
    assert_owned_partition(path);
}

#[test]
fn l_shape_meets_at_the_exact_intersection() {
    let mask = l_shape();
    assert_eq!(build_graph(&mask).edges.len(), 1);

    let result = trace_mask(&mask, &config()).unwrap();
    let path = &result.paths[0];
    assert_eq!(result.counts(), (2, 0, 0), "{:?}", path.segments);

    let corner = Point::new(1.0, 5.0);
    assert!(path.segments[0].end().distance(corner) < 1e-9);
    assert!(path.segments[1].start().distance(corner) < 1e-9);

    let interior: Vec<_> = path
        .corners
        .iter()
        .filter(|c| c.kind != CornerKind::Endpoint)
        .collect();
    assert_eq!(interior.len(), 1, "{:?}", path.corners);
    assert_eq!(interior[0].kind, CornerKind::Junction);
    assert!((interior[0].turn_angle - FRAC_PI_2).abs() < 0.1);
    assert!(interior[0].position.distance(corner) < 1e-9);
    assert_owned_partition(path);
}

#[test]
fn digitized_circles_fit_as_arcs() {
    for r in [3, 5, 10, 20, 50] {
        let (mask, center) = digitized_circle(r);
        let result = trace_mask(&mask, &config()).unwrap();
        assert_eq!(result.paths.len(), 1, "radius {r}");
        let path = &result.paths[0];
        assert!(path.closed);

        let arcs: Vec<_> = path
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Arc(arc) => Some(arc),
                _ => None,
            })
            .collect();
        assert!(
            (1..=2).contains(&arcs.len()) && arcs.len() == path.segments.len(),
            "radius {r}: {:?}",
            path.segments
        );
        let total: f64 = arcs.iter().map(|a| a.sweep()).sum();
        assert!((total.abs() - TAU).abs() < 0.05, "radius {r}: sweep {total}");
        for arc in arcs {
            assert!(arc.center.distance(center) < 0.25, "radius {r}: center {:?}", arc.center);
            assert!((arc.radius - r as f64).abs() < 0.25, "radius {r}: fitted {}", arc.radius);
        }
        assert_owned_partition(path);
    }
}

#[test]
fn square_outline_is_four_lines_meeting_exactly() {
    let mask = square_outline(11);
    assert_eq!(mask.count_foreground(), 40);

    let result = trace_mask(&mask, &config()).unwrap();
    assert_eq!(result.paths.len(), 1);
    let path = &result.paths[0];
    assert!(path.closed);
    assert_eq!(result.counts(), (4, 0, 0), "{:?}", path.segments);

    let expected = [
        Point::new(1.0, 1.0),
        Point::new(11.0, 1.0),
        Point::new(11.0, 11.0),
        Point::new(1.0, 11.0),
    ];
    for i in 0..4 {
        let (a, b) = (&path.segments[i], &path.segments[(i + 1) % 4]);
        let joint = a.end();
        assert!(joint.distance(b.start()) < 1e-9);
        let exact = intersect(a, b, 1e-9).nearest_to(joint).unwrap();
        assert!(joint.distance(exact) < 1e-9);
        assert!(expected.iter().any(|p| p.distance(joint) < 1e-9), "joint {joint:?}");
    }
    assert_eq!(path.corners.len(), 4);
    assert!(path.corners.iter().all(|c| c.kind == CornerKind::Junction));
    assert_owned_partition(path);
}

#[test]
fn half_circle_polyline_keeps_only_its_end_anchors() {
    let points = half_circle_polyline(Point::new(30.0, 10.0), 20.0, 50);
    let chain = PixelChain::open(points.clone()).unwrap();
    let path = trace_chain(&chain, &config()).unwrap();

    assert_eq!(path.corners.len(), 2, "{:?}", path.corners);
    assert!(path.corners.iter().all(|c| c.kind == CornerKind::Endpoint));
    assert!(path.corners[0].position.distance(points[0]) < 1e-6);
    assert!(path.corners[1].position.distance(points[50]) < 1e-6);

    assert_eq!(path.segments.len(), 1);
    let Segment::Arc(arc) = &path.segments[0] else {
        panic!("expected an arc, got {:?}", path.segments[0]);
    };
    assert!((arc.radius - 20.0).abs() < 1e-6);
    assert!((arc.sweep() - PI).abs() < 1e-6);
    assert_eq!(arc.winding(), Winding::Clockwise);
}

#[test]
fn every_foreground_pixel_is_traced_once() {
    let masks = [
        horizontal_run(1, 1, 5),
        l_shape(),
        square_outline(11),
        digitized_circle(12).0,
        PixelMask::from_ascii(
            "
            ..#.......####
            ..#.......#..#
            #####.....####
            ..#.........#.
            ..#.........#.
            ",
        ),
    ];
    for mask in &masks {
        let graph = build_graph(mask);
        assert_eq!(graph.accounted_pixels(), mask.count_foreground());
    }
}

#[test]
fn tee_paths_share_the_junction_node() {
    let mask = PixelMask::from_ascii(
        "
        #######
        ...#...
        ...#...
        ...#...
        ",
    );
    let graph = build_graph(&mask);
    let junction = graph
        .nodes
        .iter()
        .find(|n| n.degree >= 3)
        .map(|n| n.id)
        .unwrap();

    let result = trace_mask(&mask, &config()).unwrap();
    assert_eq!(result.paths.len(), 3);
    for path in &result.paths {
        assert!(
            path.start_node == Some(junction) || path.end_node == Some(junction),
            "{:?} / {:?}",
            path.start_node,
            path.end_node
        );
        assert_owned_partition(path);
    }
}

#[test]
fn resolving_junctions_twice_moves_nothing() {
    for mask in [l_shape(), square_outline(11), digitized_circle(10).0] {
        let result = trace_mask(&mask, &config()).unwrap();
        for path in &result.paths {
            let again = resolve_junctions(&path.segments, path.closed, 3.0, 1.0);
            for (a, b) in path.segments.iter().zip(&again) {
                assert!(a.start().distance(b.start()) < 1e-9);
                assert!(a.end().distance(b.end()) < 1e-9);
            }
            assert!(max_gap(&again, path.closed) < 1e-9);
        }
    }
}

#[test]
fn straight_legs_meet_a_fillet_without_gaps() {
    let mask = u_shape(10, 12);
    let result = trace_mask(&mask, &config()).unwrap();
    assert_eq!(result.paths.len(), 1);
    let path = &result.paths[0];
    let (lines, arcs, corners) = result.counts();
    assert!(lines >= 2 && arcs >= 1, "{:?}", path.segments);
    assert_eq!(corners, 0, "{:?}", path.segments);
    assert!(
        max_gap(&path.segments, path.closed) < 1e-9,
        "gap {} in {:?}",
        max_gap(&path.segments, path.closed),
        path.segments
    );
    assert_owned_partition(path);
}

#[test]
fn loop_with_a_tail_starts_at_its_junction() {
    let mask = lollipop();
    let graph = build_graph(&mask);
    let result = trace_mask(&mask, &config()).unwrap();
    assert_eq!(result.paths.len(), 2);

    let ring = result.paths.iter().find(|p| p.closed).unwrap();
    let node = ring.start_node.expect("ring is anchored at the junction");
    assert_eq!(ring.end_node, Some(node));
    let at = graph.nodes[node].position();
    assert_eq!(at, Point::new(4.0, 4.0));
    assert_eq!(ring.points[0], at);
    assert_eq!(*ring.points.last().unwrap(), at);
    assert_eq!(ring.segments[0].owned().start, 0);
    assert_owned_partition(ring);
}

#[test]
fn raw_stroke_pixels_do_not_disturb_a_clean_fit() {
    let skeleton = horizontal_run(2, 2, 8);
    let mut raw = skeleton.clone();
    for x in 2..10 {
        raw.set(x, 1, true);
        raw.set(x, 3, true);
    }
    let result = trace_mask_with_raw(&skeleton, Some(&raw), &config()).unwrap();
    assert_eq!(result.counts(), (1, 0, 0));
    let seg = &result.paths[0].segments[0];
    assert!(seg.start().distance(Point::new(2.0, 2.0)) < 1e-9);
    assert!(seg.end().distance(Point::new(9.0, 2.0)) < 1e-9);
}

#[test]
fn gradient_fitter_traces_the_l_with_lines() {
    let config = TracingConfig {
        fitter: FitterKind::Gradient,
        ..TracingConfig::default()
    };
    let result = trace_mask(&l_shape(), &config).unwrap();
    let (lines, arcs, _) = result.counts();
    assert!(lines >= 2);
    assert_eq!(arcs, 0);
    let path = &result.paths[0];
    assert!(path.segments[0].start().distance(Point::new(1.0, 1.0)) < 0.5);
    assert!(path.segments.last().unwrap().end().distance(Point::new(11.0, 5.0)) < 0.5);
}

#[test]
fn svg_and_gcode_follow_the_l() {
    let result = trace_mask(&l_shape(), &config()).unwrap();

    let doc = svg::document(&result, 0.5);
    assert!(doc.contains(r#"d="M1 1 L1 5 L11 5""#), "{doc}");
    assert!(doc.contains(r#"viewBox="-0.5 -0.5 13 7""#));

    let program = gcode::program(&result, &gcode::GcodeOptions::default());
    let lines: Vec<&str> = program.lines().collect();
    assert_eq!(
        lines,
        vec!["G90", "G21", "G0 X1 Y6", "G1 X1 Y2", "G1 X11 Y2", "M2"]
    );
}

#[test]
fn circle_output_uses_arc_commands() {
    let (mask, _) = digitized_circle(10);
    let result = trace_mask(&mask, &config()).unwrap();

    let d = svg::path_data(&result.paths[0]);
    assert_eq!(d.matches(" A").count(), 2, "{d}");
    assert!(d.ends_with(" Z"));

    let program = gcode::program(&result, &gcode::GcodeOptions::default());
    let arcs = program
        .lines()
        .filter(|l| l.starts_with("G2 ") || l.starts_with("G3 "))
        .count();
    assert_eq!(arcs, 2, "{program}");
    assert!(!program.contains("G1 "));
}

#[test]
fn json_presets_override_defaults() {
    let path = std::env::temp_dir().join(format!("img2arc-preset-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "max_segment_error": 0.75, "fitter": "Gradient" }"#).unwrap();
    let config = TracingConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.max_segment_error, 0.75);
    assert_eq!(config.fitter, FitterKind::Gradient);
    assert_eq!(config.min_segment_length, TracingConfig::default().min_segment_length);
}

#[test]
fn png_round_trip_through_the_loader() {
    let path = std::env::temp_dir().join(format!("img2arc-l-{}.png", std::process::id()));
    let mask = l_shape();
    let img = image::GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        image::Luma([if mask.get(x as i64, y as i64) { 0 } else { 255 }])
    });
    img.save(&path).unwrap();

    let result = img2arc::trace(&path, &config());
    std::fs::remove_file(&path).ok();
    let result = result.unwrap();
    assert_eq!((result.width, result.height), (13, 7));
    assert_eq!(result.counts(), (2, 0, 0));
}

#[test]
fn blank_image_has_no_paths() {
    let path = std::env::temp_dir().join(format!("img2arc-blank-{}.png", std::process::id()));
    image::GrayImage::from_pixel(8, 8, image::Luma([255]))
        .save(&path)
        .unwrap();
    let config = TracingConfig {
        threshold: img2arc::ThresholdMethod::Fixed(128),
        ..TracingConfig::default()
    };
    let err = img2arc::trace(&path, &config).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, img2arc::TraceError::NoPaths));
}
