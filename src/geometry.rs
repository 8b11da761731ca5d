//! Small 3-vector helpers used for chunk positions and direction cosines

/// A position or direction in scanner space
pub type Vector3 = [f64; 3];

pub fn add(a: Vector3, b: Vector3) -> Vector3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: Vector3, b: Vector3) -> Vector3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Vector3, factor: f64) -> Vector3 {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

pub fn dot(a: Vector3, b: Vector3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vector3, b: Vector3) -> Vector3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Squared euclidean length
pub fn sqlen(a: Vector3) -> f64 {
    dot(a, a)
}

pub fn len(a: Vector3) -> f64 {
    sqlen(a).sqrt()
}

/// Scale to unit length, zero vectors are returned unchanged
pub fn normalize(a: Vector3) -> Vector3 {
    let l = len(a);
    if l == 0.0 {
        a
    } else {
        scale(a, 1.0 / l)
    }
}

/// Angle between two vectors in degrees
pub fn angle_deg(a: Vector3, b: Vector3) -> f64 {
    let denom = len(a) * len(b);
    if denom == 0.0 {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Compare floats allowing `scale` units of `f32` epsilon relative to their magnitude
pub fn fuzzy_equal(a: f64, b: f64, scale: f64) -> bool {
    if a == b {
        return true;
    }
    let epsilon = f32::EPSILON as f64 * scale;
    let magnitude = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= epsilon * magnitude
}

pub fn fuzzy_equal_v(a: Vector3, b: Vector3) -> bool {
    a.iter().zip(b.iter()).all(|(&x, &y)| fuzzy_equal(x, y, 1.0))
}

/// Compare from the last component backwards, so the highest axis dominates
pub fn lexical_cmp_reverse(a: &Vector3, b: &Vector3) -> std::cmp::Ordering {
    for i in (0..3).rev() {
        // -0.0 and 0.0 must collide
        let ord = (a[i] + 0.0).total_cmp(&(b[i] + 0.0));
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}
