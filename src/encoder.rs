//! Way tags, edge flags, and the tag encoders that map one to the other.

use crate::geo::GeoPoint;

/// Transient tag carrier for one about-to-be-committed edge.
///
/// Built by the importer from a road's normalized attributes, handed to the
/// tag encoder, then to edge-added listeners, then dropped. Tags keep their
/// insertion order; setting an existing key replaces its value in place.
#[derive(Debug, Clone)]
pub struct Way {
    id: i64,
    tags: Vec<(String, String)>,
    pub estimated_distance_m: f64,
    pub estimated_center: Option<GeoPoint>,
}

impl Way {
    pub fn new(id: i64) -> Self {
        Way {
            id,
            tags: Vec::new(),
            estimated_distance_m: 0.0,
            estimated_center: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_tag(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.tags.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_string();
        } else {
            self.tags.push((key.to_string(), value.to_string()));
        }
    }

    /// Chainable tag setter, mostly for building fixtures.
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.set_tag(key, value);
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tag(key).is_some()
    }

    /// Tags in insertion order.
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }
}

/// Encoded movement attributes of one edge. Opaque to the importer; the
/// only meaning it reads is emptiness (empty flags drop the edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeFlags(u64);

impl EdgeFlags {
    pub const EMPTY: EdgeFlags = EdgeFlags(0);

    pub fn new(bits: u64) -> Self {
        EdgeFlags(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Movement profile an encoder derives from a way before packing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayAccess {
    pub forward: bool,
    pub backward: bool,
    pub speed_kmh: f64,
}

/// Turns normalized way tags into packed edge flags.
///
/// `accept_way` decides routability; `None` drops the way silently. For
/// accepted ways, `encode` packs the access profile; encoders may still
/// return empty flags, which also drops the way.
pub trait TagEncoder {
    fn accept_way(&self, way: &Way) -> Option<WayAccess>;

    fn encode(&self, way: &Way, access: WayAccess) -> EdgeFlags;
}

/// Car movement encoder: base speed per highway class, explicit access
/// denials, oneway direction (with motorways oneway by default), and a
/// numeric maxspeed override.
#[derive(Debug, Default, Clone, Copy)]
pub struct CarTagEncoder;

/// Flag layout used by [`CarTagEncoder`]: direction bits plus the speed in
/// km/h in the second byte.
const FLAG_FORWARD: u64 = 1 << 0;
const FLAG_BACKWARD: u64 = 1 << 1;
const SPEED_SHIFT: u32 = 8;
const SPEED_MAX_KMH: u64 = 255;

/// Default speeds by highway class (km/h). `None` means cars do not belong
/// on this class at all.
fn base_speed_kmh(highway: &str) -> Option<f64> {
    let speed = match highway {
        "motorway" => 110.0,
        "motorway_link" => 60.0,
        "trunk" => 90.0,
        "trunk_link" => 50.0,
        "primary" => 70.0,
        "primary_link" => 40.0,
        "secondary" => 60.0,
        "secondary_link" => 40.0,
        "tertiary" => 50.0,
        "tertiary_link" => 30.0,
        "unclassified" => 50.0,
        "residential" => 30.0,
        "service" => 20.0,
        "living_street" => 10.0,
        _ => return None,
    };
    Some(speed)
}

/// Check if access is explicitly denied.
fn is_denied(value: Option<&str>) -> bool {
    matches!(value, Some("no") | Some("private"))
}

impl CarTagEncoder {
    /// Recover the access profile from packed flags.
    pub fn unpack(flags: EdgeFlags) -> WayAccess {
        let bits = flags.bits();
        WayAccess {
            forward: bits & FLAG_FORWARD != 0,
            backward: bits & FLAG_BACKWARD != 0,
            speed_kmh: ((bits >> SPEED_SHIFT) & SPEED_MAX_KMH) as f64,
        }
    }
}

impl TagEncoder for CarTagEncoder {
    fn accept_way(&self, way: &Way) -> Option<WayAccess> {
        let highway = way.tag("highway")?;
        let base = base_speed_kmh(highway)?;

        if is_denied(way.tag("motor_vehicle"))
            || is_denied(way.tag("vehicle"))
            || is_denied(way.tag("access"))
        {
            return None;
        }

        let mut forward = true;
        let mut backward = true;
        let mut explicit_oneway = false;
        if let Some(oneway) = way.tag("oneway") {
            match oneway {
                "yes" | "1" | "true" => {
                    backward = false;
                    explicit_oneway = true;
                }
                "-1" | "reverse" => {
                    forward = false;
                    explicit_oneway = true;
                }
                _ => {}
            }
        }

        // Motorways and motorway links are oneway unless tagged otherwise.
        if !explicit_oneway && (highway == "motorway" || highway == "motorway_link") {
            backward = false;
        }

        let speed_kmh = way
            .tag("maxspeed")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| *v > 0.0)
            .unwrap_or(base);

        Some(WayAccess {
            forward,
            backward,
            speed_kmh,
        })
    }

    fn encode(&self, _way: &Way, access: WayAccess) -> EdgeFlags {
        if !access.forward && !access.backward {
            return EdgeFlags::EMPTY;
        }
        let mut bits = 0u64;
        if access.forward {
            bits |= FLAG_FORWARD;
        }
        if access.backward {
            bits |= FLAG_BACKWARD;
        }
        let speed = (access.speed_kmh.round() as u64).min(SPEED_MAX_KMH);
        bits |= speed << SPEED_SHIFT;
        EdgeFlags::new(bits)
    }
}
