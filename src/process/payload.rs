// src/process/payload.rs

use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{AxisEntry, AxisTable, Code};
use crate::error::{EstatError, Result};

pub const TIME_AXIS: &str = "time";
pub const CATEGORY_AXIS: &str = "cat01";
pub const AREA_AXIS: &str = "area";

/// e-Stat statuses at or above this are request failures reported in-band.
const API_ERROR_STATUS: u32 = 100;

/// The raw format collapses one-element lists into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(x) => vec![x],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumOrText {
    Num(f64),
    Text(String),
}

impl NumOrText {
    fn as_text(&self) -> String {
        match self {
            NumOrText::Num(n) => n.to_string(),
            NumOrText::Text(s) => s.clone(),
        }
    }

    /// Finite numbers only; `"NaN"` and `"inf"` parse as floats but are not data.
    fn as_f64(&self) -> Option<f64> {
        let v = match self {
            NumOrText::Num(n) => *n,
            NumOrText::Text(s) => s.trim().parse().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "GET_STATS_DATA")]
    get_stats_data: GetStatsData,
}

#[derive(Debug, Deserialize)]
struct GetStatsData {
    #[serde(rename = "RESULT")]
    result: Option<ApiResult>,
    #[serde(rename = "STATISTICAL_DATA")]
    statistical_data: Option<StatisticalData>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(rename = "STATUS")]
    status: Option<NumOrText>,
    #[serde(rename = "ERROR_MSG", default)]
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatisticalData {
    #[serde(rename = "CLASS_INF")]
    class_inf: ClassInf,
    #[serde(rename = "DATA_INF")]
    data_inf: DataInf,
}

#[derive(Debug, Deserialize)]
struct ClassInf {
    #[serde(rename = "CLASS_OBJ")]
    class_obj: OneOrMany<ClassObj>,
}

#[derive(Debug, Deserialize)]
struct ClassObj {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "CLASS")]
    class: OneOrMany<ClassItem>,
}

#[derive(Debug, Deserialize)]
struct ClassItem {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@level", default)]
    level: Option<NumOrText>,
    #[serde(rename = "@parentCode", default)]
    parent_code: Option<String>,
    #[serde(rename = "@unit", default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataInf {
    #[serde(rename = "VALUE")]
    value: OneOrMany<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(rename = "@time")]
    time: String,
    #[serde(rename = "@area")]
    area: String,
    #[serde(rename = "@cat01")]
    cat01: String,
    #[serde(rename = "$")]
    value: NumOrText,
}

/// One recorded value keyed by a code from each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: Code,
    pub area: Code,
    pub category: Code,
    pub value: f64,
}

/// The three axes plus the flat observation list, as found in the payload.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub time: AxisTable,
    pub category: AxisTable,
    pub area: AxisTable,
    pub observations: Vec<Observation>,
}

fn to_entry(item: ClassItem) -> AxisEntry {
    let level = item
        .level
        .as_ref()
        .and_then(|l| l.as_text().trim().parse::<i32>().ok())
        .unwrap_or(0);
    let mut entry = AxisEntry::new(item.code, item.name).with_level(level);
    if let Some(parent) = item.parent_code.filter(|p| !p.is_empty()) {
        entry = entry.with_parent(parent);
    }
    entry.with_unit(item.unit)
}

/// Decode raw bytes and pull out the time, category and area axes together
/// with every observation cell.
pub fn extract(bytes: &[u8]) -> Result<Extracted> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| EstatError::malformed(format!("decoding payload: {}", e)))?;
    let data = envelope.get_stats_data;

    check_status(data.result.as_ref())?;

    let stats = data
        .statistical_data
        .ok_or_else(|| EstatError::malformed("STATISTICAL_DATA is absent"))?;

    let mut class_objs = stats.class_inf.class_obj.into_vec();
    let time = take_axis(&mut class_objs, TIME_AXIS)?;
    let category = take_axis(&mut class_objs, CATEGORY_AXIS)?;
    let area = take_axis(&mut class_objs, AREA_AXIS)?;

    let observations = stats
        .data_inf
        .value
        .into_vec()
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            let value = cell.value.as_f64().ok_or_else(|| {
                EstatError::malformed(format!(
                    "value #{} ({}, {}, {}) is not numeric: {:?}",
                    idx,
                    cell.time,
                    cell.area,
                    cell.cat01,
                    cell.value.as_text()
                ))
            })?;
            Ok(Observation {
                time: cell.time,
                area: cell.area,
                category: cell.cat01,
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        times = time.len(),
        categories = category.len(),
        areas = area.len(),
        observations = observations.len(),
        "extracted axes"
    );

    Ok(Extracted {
        time,
        category,
        area,
        observations,
    })
}

fn check_status(result: Option<&ApiResult>) -> Result<()> {
    let Some(result) = result else {
        return Ok(());
    };
    let status = result
        .status
        .as_ref()
        .and_then(|s| s.as_text().trim().parse::<f64>().ok())
        .map(|s| s as u32)
        .unwrap_or(0);
    if status >= API_ERROR_STATUS {
        let msg = result.error_msg.clone().unwrap_or_default();
        warn!(status, msg = %msg, "API reported an error");
        return Err(EstatError::transport(
            "getStatsData",
            format!("API status {}: {}", status, msg),
        ));
    }
    Ok(())
}

/// Index the first CLASS_OBJ with the given `@id`.
fn take_axis(class_objs: &mut Vec<ClassObj>, id: &str) -> Result<AxisTable> {
    let pos = class_objs
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| EstatError::malformed(format!("axis `{}` is absent", id)))?;
    let obj = class_objs.remove(pos);
    Ok(obj.class.into_vec().into_iter().map(to_entry).collect())
}
