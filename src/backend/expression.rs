//! Server-side expression graph for one period composite.
//!
//! The graph loads the Landsat Collection 2 Level-2 surface reflectance
//! collections of one sensor family and filters them to the period and
//! region. Each scene is cloud masked from its `QA_PIXEL` flags and cut down
//! to float Red/Green/Blue bands before the collections are merged and
//! reduced with a median. The median is rescaled from digital numbers to
//! reflectance, and pixels left without data are filled with
//! [`MASKED_SENTINEL`].

use super::npy::MASKED_SENTINEL;
use crate::cadence::Period;
use crate::composite::Band;
use crate::region::Region;
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};

/// Collection 2 Level-2 surface reflectance scale factor.
const SR_SCALE: f64 = 0.000_027_5;
/// Collection 2 Level-2 surface reflectance offset.
const SR_OFFSET: f64 = -0.2;

/// Quality band carrying the per-pixel Fmask flags.
const QA_BAND: &str = "QA_PIXEL";
/// `QA_PIXEL` bits 3 (cloud), 4 (cloud shadow) and 5 (snow).
const QA_OBSTRUCTED_BITS: u32 = 0b11_1000;

const SCENE_ARGUMENT: &str = "scene";

/// First calendar year composited from the OLI sensors.
const OLI_FIRST_YEAR: i32 = 2013;

/// Landsat sensors that share a band layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFamily {
    /// Landsat 5 TM and Landsat 7 ETM+.
    ThematicMapper,
    /// Landsat 8 and 9 OLI.
    OperationalLandImager,
}

impl SensorFamily {
    /// Family used for a period starting in `year`.
    pub fn for_year(year: i32) -> Self {
        if year < OLI_FIRST_YEAR {
            SensorFamily::ThematicMapper
        } else {
            SensorFamily::OperationalLandImager
        }
    }

    pub fn collections(self) -> [&'static str; 2] {
        match self {
            SensorFamily::ThematicMapper => ["LANDSAT/LT05/C02/T1_L2", "LANDSAT/LE07/C02/T1_L2"],
            SensorFamily::OperationalLandImager => {
                ["LANDSAT/LC08/C02/T1_L2", "LANDSAT/LC09/C02/T1_L2"]
            }
        }
    }

    /// Native surface reflectance band for a display band.
    pub fn band(self, band: Band) -> &'static str {
        match (self, band) {
            (SensorFamily::ThematicMapper, Band::Red) => "SR_B3",
            (SensorFamily::ThematicMapper, Band::Green) => "SR_B2",
            (SensorFamily::ThematicMapper, Band::Blue) => "SR_B1",
            (SensorFamily::OperationalLandImager, Band::Red) => "SR_B4",
            (SensorFamily::OperationalLandImager, Band::Green) => "SR_B3",
            (SensorFamily::OperationalLandImager, Band::Blue) => "SR_B2",
        }
    }
}

/// A serialized expression producing one period's RGB reflectance image.
#[derive(Debug, Clone)]
pub struct CompositeExpression {
    family: SensorFamily,
    graph: Value,
}

impl CompositeExpression {
    /// Builds the expression for `period` over `region`.
    pub fn for_period(region: &Region, period: &Period) -> Self {
        let family = SensorFamily::for_year(period.year());
        let bounds = region.bounds();
        let mut graph = Graph::default();

        let geometry = invoke(
            "GeometryConstructors.Polygon",
            [
                ("coordinates", constant(json!([bounds.ring()]))),
                ("geodesic", constant(json!(false))),
            ],
        );
        let date_range = invoke(
            "DateRange",
            [
                ("start", iso_date(period.start)),
                ("end", iso_date(period.end)),
            ],
        );

        let native: Vec<&str> = Band::RGB.iter().map(|b| family.band(*b)).collect();
        let display: Vec<&str> = Band::RGB.iter().map(|b| b.name()).collect();
        let prepare = graph.function(SCENE_ARGUMENT, clear_scene(&native, &display));

        let prepared: Vec<Value> = family
            .collections()
            .iter()
            .map(|id| {
                let loaded = invoke("ImageCollection.load", [("id", constant(json!(id)))]);
                let dated = invoke(
                    "Collection.filter",
                    [
                        ("collection", loaded),
                        (
                            "filter",
                            invoke(
                                "Filter.dateRangeContains",
                                [
                                    ("leftValue", date_range.clone()),
                                    ("rightField", constant(json!("system:time_start"))),
                                ],
                            ),
                        ),
                    ],
                );
                let located = invoke(
                    "Collection.filter",
                    [
                        ("collection", dated),
                        (
                            "filter",
                            invoke(
                                "Filter.intersects",
                                [
                                    ("leftField", constant(json!(".geo"))),
                                    ("rightValue", geometry.clone()),
                                ],
                            ),
                        ),
                    ],
                );
                invoke(
                    "Collection.map",
                    [("collection", located), ("baseAlgorithm", prepare.clone())],
                )
            })
            .collect();

        // A fully masked image keeps the median well-defined for empty periods.
        let placeholder = invoke(
            "Image.mask",
            [
                (
                    "image",
                    invoke(
                        "Image.toFloat",
                        [(
                            "value",
                            invoke(
                                "Image.rename",
                                [
                                    ("input", image_constant(json!([0, 0, 0]))),
                                    ("names", constant(json!(display))),
                                ],
                            ),
                        )],
                    ),
                ),
                ("mask", image_constant(json!(0))),
            ],
        );

        let merged = prepared
            .into_iter()
            .chain(std::iter::once(invoke(
                "ImageCollection.fromImages",
                [("images", json!({ "arrayValue": { "values": [placeholder] } }))],
            )))
            .reduce(|acc, next| {
                invoke("Collection.merge", [("collection1", acc), ("collection2", next)])
            })
            .unwrap_or(Value::Null);

        let reduced = invoke(
            "ImageCollection.reduce",
            [
                ("collection", merged),
                ("reducer", invoke("Reducer.median", [])),
            ],
        );

        let medians: Vec<String> = display.iter().map(|b| format!("{b}_median")).collect();
        let renamed = invoke(
            "Image.select",
            [
                ("input", reduced),
                ("bandSelectors", constant(json!(medians))),
                ("newNames", constant(json!(display))),
            ],
        );

        let scaled = invoke(
            "Image.add",
            [
                (
                    "image1",
                    invoke(
                        "Image.multiply",
                        [
                            ("image1", renamed),
                            ("image2", image_constant(json!(SR_SCALE))),
                        ],
                    ),
                ),
                ("image2", image_constant(json!(SR_OFFSET))),
            ],
        );

        let reflectance = invoke(
            "Image.unmask",
            [
                ("input", scaled),
                ("value", constant(json!(MASKED_SENTINEL))),
                ("sameFootprint", constant(json!(false))),
            ],
        );

        Self {
            family,
            graph: graph.finish(reflectance),
        }
    }

    pub fn family(&self) -> SensorFamily {
        self.family
    }

    pub fn to_json(&self) -> &Value {
        &self.graph
    }
}

/// Per-scene preparation: drops cloud, shadow and snow pixels, keeps the
/// three visible bands under their display names and casts them to float.
fn clear_scene(native: &[&str], display: &[&str]) -> Value {
    let scene = json!({ "argumentReference": SCENE_ARGUMENT });
    let flags = invoke(
        "Image.bitwiseAnd",
        [
            (
                "image1",
                invoke(
                    "Image.select",
                    [
                        ("input", scene.clone()),
                        ("bandSelectors", constant(json!([QA_BAND]))),
                    ],
                ),
            ),
            ("image2", image_constant(json!(QA_OBSTRUCTED_BITS))),
        ],
    );
    let clear = invoke(
        "Image.eq",
        [("image1", flags), ("image2", image_constant(json!(0)))],
    );
    let masked = invoke("Image.updateMask", [("image", scene), ("mask", clear)]);
    let selected = invoke(
        "Image.select",
        [
            ("input", masked),
            ("bandSelectors", constant(json!(native))),
            ("newNames", constant(json!(display))),
        ],
    );
    invoke("Image.toFloat", [("value", selected)])
}

/// Value table of a serialized expression.
#[derive(Debug, Default)]
struct Graph {
    values: Map<String, Value>,
}

impl Graph {
    fn define(&mut self, value: Value) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), value);
        key
    }

    /// A one-argument function whose body lives in the value table.
    fn function(&mut self, argument: &str, body: Value) -> Value {
        let body = self.define(body);
        json!({
            "functionDefinitionValue": {
                "argumentNames": [argument],
                "body": body,
            }
        })
    }

    fn finish(mut self, result: Value) -> Value {
        let result = self.define(result);
        json!({ "result": result, "values": self.values })
    }
}
