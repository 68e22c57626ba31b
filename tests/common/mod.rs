//! Synthetic masks and chains shared by the integration tests.

#![allow(dead_code)]

use img2arc::kurbo::Point;
use img2arc::PixelMask;

/// Horizontal run of `len` pixels starting at (`x0`, `y`).
pub fn horizontal_run(x0: u32, y: u32, len: u32) -> PixelMask {
    let mut mask = PixelMask::new(x0 + len + 1, y + 2);
    for x in x0..x0 + len {
        mask.set(x, y, true);
    }
    mask
}

/// Five pixels down from (1, 1), then ten to the right along y = 5.
pub fn l_shape() -> PixelMask {
    let mut mask = PixelMask::new(13, 7);
    for y in 1..=5 {
        mask.set(1, y, true);
    }
    for x in 2..=11 {
        mask.set(x, 5, true);
    }
    mask
}

/// Outline of a square with `side` pixels per edge, top-left at (1, 1).
/// A side of 11 gives 40 pixels.
pub fn square_outline(side: u32) -> PixelMask {
    let size = side + 2;
    let mut mask = PixelMask::new(size, size);
    let (lo, hi) = (1, side);
    for i in lo..=hi {
        mask.set(i, lo, true);
        mask.set(i, hi, true);
        mask.set(lo, i, true);
        mask.set(hi, i, true);
    }
    mask
}

/// Midpoint circle of radius `r` centered at (`r + 2`, `r + 2`).
pub fn digitized_circle(r: i64) -> (PixelMask, Point) {
    let c = r + 2;
    let size = (2 * r + 5) as u32;
    let mut mask = PixelMask::new(size, size);
    let (mut x, mut y, mut err) = (r, 0i64, 1 - r);
    while x >= y {
        for (dx, dy) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            mask.set((c + dx) as u32, (c + dy) as u32, true);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
    (mask, Point::new(c as f64, c as f64))
}

/// Upper half of a radius-`r` midpoint circle centered at (`r + 2`, `r + 2`)
/// with a vertical leg of `legs` pixels hanging from each end.
pub fn u_shape(r: i64, legs: i64) -> PixelMask {
    let (circle, center) = digitized_circle(r);
    let c = center.x as i64;
    let mut mask = PixelMask::new(circle.width(), (c + legs + 2) as u32);
    for (x, y) in circle.iter_foreground() {
        if (y as i64) <= c {
            mask.set(x, y, true);
        }
    }
    for y in c + 1..=c + legs {
        mask.set((c - r) as u32, y as u32, true);
        mask.set((c + r) as u32, y as u32, true);
    }
    mask
}

/// A ring with a tail: the outline of a 7×5 box whose bottom edge carries
/// a three-pixel stem at its midpoint.
pub fn lollipop() -> PixelMask {
    PixelMask::from_ascii(
        "
        .........
        ..#####..
        ..#...#..
        ..#...#..
        ..#####..
        ....#....
        ....#....
        ....#....
        ",
    )
}

/// `segments + 1` points evenly spaced on the lower half of a circle,
/// from angle 0 to π.
pub fn half_circle_polyline(center: Point, radius: f64, segments: usize) -> Vec<Point> {
    (0..=segments)
        .map(|k| {
            let a = std::f64::consts::PI * k as f64 / segments as f64;
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Every path's owned spans run back to back over its unique points.
pub fn assert_owned_partition(path: &img2arc::TracedPath) {
    let unique = if path.closed {
        path.points.len() - 1
    } else {
        path.points.len()
    };
    let mut next = 0;
    for seg in &path.segments {
        let owned = seg.owned();
        assert_eq!(owned.start, next, "owned spans must be contiguous: {:?}", path.segments);
        next = owned.end;
    }
    assert_eq!(next, unique, "owned spans must cover every point");
}
