use crate::coordinate::Coordinate;

/// Inserts the midpoint between every consecutive pair of points.
///
/// A polyline of `n >= 1` points becomes `2n - 1` points; endpoints and
/// ordering are preserved.
pub fn densify(polyline: &[Coordinate]) -> Vec<Coordinate> {
    let Some((first, rest)) = polyline.split_first() else {
        return Vec::new();
    };

    let mut dense = Vec::with_capacity(polyline.len() * 2 - 1);
    dense.push(*first);

    let mut previous = first;
    for point in rest {
        dense.push(previous.midpoint(point));
        dense.push(*point);
        previous = point;
    }

    dense
}
