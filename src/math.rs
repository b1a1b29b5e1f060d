use nalgebra as na;
use num_traits::Float;

/// Distance from `point` to the infinite line through `line_start` and
/// `line_end`, via the line-coefficient formula.
///
/// The line must not be degenerate: callers guard `line_start != line_end`.
pub fn perpendicular_distance<T: na::RealField + Float>(
    point: &na::Point2<T>,
    line_start: &na::Point2<T>,
    line_end: &na::Point2<T>,
) -> T {
    let a = line_end.y - line_start.y;
    let b = line_start.x - line_end.x;
    let c = line_end.x * line_start.y - line_start.x * line_end.y;

    Float::abs(a * point.x + b * point.y + c) / Float::sqrt(a * a + b * b)
}

/// Total length of the polyline through `points`, in order.
pub fn path_length<T: na::RealField + Float>(points: &[na::Point2<T>]) -> T {
    points
        .windows(2)
        .map(|w| {
            let dx = w[1].x - w[0].x;
            let dy = w[1].y - w[0].y;
            Float::sqrt(dx * dx + dy * dy)
        })
        .fold(T::zero(), |acc, d| acc + d)
}
