use geo::{Contains, LineString, Point, Polygon};

/// A closed ring of (lon, lat) positions, first == last
pub type Ring = Vec<(f64, f64)>;

const EPSILON: f64 = 1e-9;

fn same_position(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < EPSILON && (a.1 - b.1).abs() < EPSILON
}

/// A closed linear ring needs at least four positions.
pub fn is_closed(points: &[(f64, f64)]) -> bool {
    match (points.first(), points.last()) {
        (Some(&first), Some(&last)) => points.len() >= 4 && same_position(first, last),
        _ => false,
    }
}

/// A ring built by `join_rings`, with the input segments it was made from
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRing {
    pub points: Ring,
    /// Indices into the `segments` passed to `join_rings`
    pub segments: Vec<usize>,
}

/// Join way segments end to end into closed rings.
///
/// # Algorithm
/// 1. Take the first pending segment
/// 2. While it is open, append the pending segment that starts or ends
///    at its last position (reversing it if needed)
/// 3. Keep the chain if it closed, drop it otherwise
///
/// Segments are consumed in input order so the output is deterministic.
/// Segments that end up in no ring are absent from every `JoinedRing::segments`.
pub fn join_rings(segments: Vec<Vec<(f64, f64)>>) -> Vec<JoinedRing> {
    let mut pending: Vec<(usize, Vec<(f64, f64)>)> = segments
        .into_iter()
        .enumerate()
        .filter(|(_, s)| s.len() >= 2)
        .collect();
    let mut rings = Vec::new();

    while !pending.is_empty() {
        let (first_idx, mut current) = pending.remove(0);
        let mut used = vec![first_idx];

        while !is_closed(&current) {
            let Some(&tail) = current.last() else {
                break;
            };

            let next = pending.iter().position(|(_, segment)| {
                let starts = segment.first().is_some_and(|&p| same_position(p, tail));
                let ends = segment.last().is_some_and(|&p| same_position(p, tail));
                starts || ends
            });

            let Some(pos) = next else {
                break;
            };

            let (idx, mut segment) = pending.remove(pos);
            if !segment.first().is_some_and(|&p| same_position(p, tail)) {
                segment.reverse();
            }
            current.extend(segment.into_iter().skip(1));
            used.push(idx);
        }

        if is_closed(&current) {
            used.sort_unstable();
            rings.push(JoinedRing {
                points: current,
                segments: used,
            });
        }
    }

    rings
}

/// Group rings into polygons: each outer ring followed by the inner rings
/// it contains. Inner rings outside every outer ring are left out; the
/// second value lists the indices of the inner rings that were placed.
pub fn assemble_polygons(outers: Vec<Ring>, inners: Vec<Ring>) -> (Vec<Vec<Ring>>, Vec<usize>) {
    let shapes: Vec<Polygon<f64>> = outers
        .iter()
        .map(|ring| Polygon::new(LineString::from(ring.clone()), vec![]))
        .collect();

    let mut polygons: Vec<Vec<Ring>> = outers.into_iter().map(|ring| vec![ring]).collect();
    let mut placed = Vec::new();

    for (inner_idx, inner) in inners.into_iter().enumerate() {
        let owner = shapes.iter().position(|shape| {
            inner
                .iter()
                .any(|&(x, y)| shape.contains(&Point::new(x, y)))
        });

        if let Some(idx) = owner {
            polygons[idx].push(inner);
            placed.push(inner_idx);
        }
    }

    (polygons, placed)
}
