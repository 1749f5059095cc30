use crate::api::OverpassResponse;
use crate::api::overpass::{Element, LatLon, Member};
use crate::error::ConversionError;
use crate::geometry::{JoinedRing, assemble_polygons, is_closed, join_rings};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use std::collections::{HashMap, HashSet};

/// Tags that do not make an element worth its own feature
const UNINTERESTING_TAGS: &[&str] = &[
    "source",
    "source_ref",
    "source:ref",
    "history",
    "attribution",
    "created_by",
    "tiger:county",
    "tiger:tlid",
    "tiger:upload_uuid",
];

/// Keys that make a closed way a line rather than an area
const LINEAR_KEYS: &[&str] = &["highway", "barrier", "railway", "waterway"];

type Position = (f64, f64);

/// Convert an Overpass response into a GeoJSON FeatureCollection
///
/// # Algorithm
/// 1. Build node_id → (lon, lat) and way_id → positions lookups
/// 2. Build relation features first, remembering which ways were absorbed
///    into multipolygon/boundary rings
/// 3. Walk the elements in document order:
///    - nodes become Points unless they are plain vertices of a way or relation
///    - ways become Polygons (closed, not linear) or LineStrings, unless
///      they are untagged parts of an assembled area
///    - relations take the feature built in step 2
pub fn convert(response: &OverpassResponse) -> Result<FeatureCollection, ConversionError> {
    if let Some(remark) = &response.remark
        && remark.contains("runtime error")
    {
        return Err(ConversionError::Remark(remark.clone()));
    }

    let nodes = build_node_lookup(response);
    let ways = build_way_lookup(response, &nodes);
    let referenced_nodes = referenced_node_ids(response);

    let mut absorbed_ways = HashSet::new();
    let mut relation_features = HashMap::new();
    for element in response.elements.iter().filter(|e| e.type_ == "relation") {
        if let Some((feature, consumed)) = relation_feature(element, &nodes, &ways) {
            absorbed_ways.extend(consumed);
            relation_features.insert(element.id, feature);
        }
    }

    let mut features = Vec::new();

    for element in &response.elements {
        let feature = match element.type_.as_str() {
            "node" => {
                if referenced_nodes.contains(&element.id) && !has_interesting_tags(element) {
                    continue;
                }
                match (element.lat, element.lon) {
                    (Some(lat), Some(lon)) => {
                        Some(build_feature(element, Value::Point(vec![lon, lat])))
                    }
                    _ => None,
                }
            }
            "way" => {
                if absorbed_ways.contains(&element.id) && !has_interesting_tags(element) {
                    continue;
                }
                ways.get(&element.id)
                    .and_then(|points| way_geometry(element, points))
                    .map(|value| build_feature(element, value))
            }
            "relation" => relation_features.remove(&element.id),
            _ => None,
        };

        if let Some(feature) = feature {
            features.push(feature);
        }
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn build_node_lookup(response: &OverpassResponse) -> HashMap<u64, Position> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            Some((e.id, (lon, lat)))
        })
        .collect()
}

fn build_way_lookup(
    response: &OverpassResponse,
    nodes: &HashMap<u64, Position>,
) -> HashMap<u64, Vec<Position>> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "way")
        .map(|e| {
            let points = match (&e.geometry, &e.nodes) {
                (Some(geometry), _) => inline_positions(geometry),
                (None, Some(node_refs)) => node_refs
                    .iter()
                    .filter_map(|id| nodes.get(id).copied())
                    .collect(),
                (None, None) => Vec::new(),
            };
            (e.id, points)
        })
        .collect()
}

fn inline_positions(geometry: &[Option<LatLon>]) -> Vec<Position> {
    geometry.iter().flatten().map(|p| (p.lon, p.lat)).collect()
}

fn referenced_node_ids(response: &OverpassResponse) -> HashSet<u64> {
    let mut ids = HashSet::new();

    for element in &response.elements {
        if let Some(node_refs) = &element.nodes {
            ids.extend(node_refs.iter().copied());
        }
        if let Some(members) = &element.members {
            ids.extend(members.iter().filter(|m| m.type_ == "node").map(|m| m.ref_));
        }
    }

    ids
}

fn has_interesting_tags(element: &Element) -> bool {
    element.tags.as_ref().is_some_and(|tags| {
        tags.keys()
            .any(|key| !UNINTERESTING_TAGS.contains(&key.as_str()))
    })
}

fn is_linear(element: &Element) -> bool {
    match element.tag("area") {
        Some("yes") => false,
        Some("no") => true,
        _ => {
            LINEAR_KEYS.iter().any(|key| element.tag(key).is_some())
                || element.tag("natural") == Some("coastline")
        }
    }
}

fn is_area_relation(element: &Element) -> bool {
    matches!(element.tag("type"), Some("multipolygon") | Some("boundary"))
}

fn to_positions(points: &[Position]) -> Vec<Vec<f64>> {
    points.iter().map(|&(lon, lat)| vec![lon, lat]).collect()
}

fn way_geometry(element: &Element, points: &[Position]) -> Option<Value> {
    if points.len() < 2 {
        return None;
    }

    if is_closed(points) && !is_linear(element) {
        Some(Value::Polygon(vec![to_positions(points)]))
    } else {
        Some(Value::LineString(to_positions(points)))
    }
}

fn member_way_points(member: &Member, ways: &HashMap<u64, Vec<Position>>) -> Vec<Position> {
    match &member.geometry {
        Some(geometry) => inline_positions(geometry),
        None => ways.get(&member.ref_).cloned().unwrap_or_default(),
    }
}

fn member_node_point(member: &Member, nodes: &HashMap<u64, Position>) -> Option<Position> {
    match (member.lat, member.lon) {
        (Some(lat), Some(lon)) => Some((lon, lat)),
        _ => nodes.get(&member.ref_).copied(),
    }
}

/// Returns the feature and the ids of the ways absorbed into its rings
fn relation_feature(
    element: &Element,
    nodes: &HashMap<u64, Position>,
    ways: &HashMap<u64, Vec<Position>>,
) -> Option<(Feature, Vec<u64>)> {
    let members = element.members.as_deref().unwrap_or_default();

    if is_area_relation(element)
        && let Some((value, consumed)) = area_geometry(members, ways)
    {
        return Some((build_feature(element, value), consumed));
    }

    let geometries: Vec<Geometry> = members
        .iter()
        .filter_map(|member| match member.type_.as_str() {
            "node" => member_node_point(member, nodes)
                .map(|(lon, lat)| Geometry::new(Value::Point(vec![lon, lat]))),
            "way" => {
                let points = member_way_points(member, ways);
                (points.len() >= 2).then(|| Geometry::new(Value::LineString(to_positions(&points))))
            }
            _ => None,
        })
        .collect();

    if geometries.is_empty() {
        return None;
    }

    Some((
        build_feature(element, Value::GeometryCollection(geometries)),
        Vec::new(),
    ))
}

/// Returns the MultiPolygon and the ids of the ways that ended up in it.
/// Ways that close no ring, and inner rings outside every outer ring, are
/// not reported so they still get their own feature.
fn area_geometry(
    members: &[Member],
    ways: &HashMap<u64, Vec<Position>>,
) -> Option<(Value, Vec<u64>)> {
    let mut outer = Vec::new();
    let mut outer_refs = Vec::new();
    let mut inner = Vec::new();
    let mut inner_refs = Vec::new();

    for member in members.iter().filter(|m| m.type_ == "way") {
        let (segments, refs) = match member.role.as_str() {
            "outer" | "" => (&mut outer, &mut outer_refs),
            "inner" => (&mut inner, &mut inner_refs),
            _ => continue,
        };
        segments.push(member_way_points(member, ways));
        refs.push(member.ref_);
    }

    let outer_rings: Vec<JoinedRing> = join_rings(outer);
    if outer_rings.is_empty() {
        return None;
    }
    let inner_rings = join_rings(inner);

    let mut consumed: Vec<u64> = outer_rings
        .iter()
        .flat_map(|ring| ring.segments.iter().map(|&idx| outer_refs[idx]))
        .collect();

    let (polygons, placed) = assemble_polygons(
        outer_rings.into_iter().map(|ring| ring.points).collect(),
        inner_rings.iter().map(|ring| ring.points.clone()).collect(),
    );
    for idx in placed {
        consumed.extend(inner_rings[idx].segments.iter().map(|&seg| inner_refs[seg]));
    }

    let polygons: Vec<Vec<Vec<Vec<f64>>>> = polygons
        .into_iter()
        .map(|rings| rings.iter().map(|ring| to_positions(ring)).collect())
        .collect();

    Some((Value::MultiPolygon(polygons), consumed))
}

fn build_feature(element: &Element, value: Value) -> Feature {
    let osm_id = format!("{}/{}", element.type_, element.id);

    let mut properties = JsonObject::new();
    if let Some(tags) = &element.tags {
        for (key, value) in tags {
            properties.insert(key.clone(), JsonValue::from(value.as_str()));
        }
    }
    properties.insert("@id".to_string(), JsonValue::from(osm_id.as_str()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::String(osm_id)),
        properties: Some(properties),
        foreign_members: None,
    }
}
