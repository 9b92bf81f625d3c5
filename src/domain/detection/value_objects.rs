//! Detection Context - Value Objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 边界框，像素坐标 (x_min, y_min, x_max, y_max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BoundingBoxRepr")]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

/// 模型有时输出 `[x_min, y_min, x_max, y_max]` 数组
#[derive(Deserialize)]
#[serde(untagged)]
enum BoundingBoxRepr {
    Object {
        x_min: u32,
        y_min: u32,
        x_max: u32,
        y_max: u32,
    },
    List([u32; 4]),
}

impl From<BoundingBoxRepr> for BoundingBox {
    fn from(repr: BoundingBoxRepr) -> Self {
        match repr {
            BoundingBoxRepr::Object {
                x_min,
                y_min,
                x_max,
                y_max,
            } => Self {
                x_min,
                y_min,
                x_max,
                y_max,
            },
            BoundingBoxRepr::List([x_min, y_min, x_max, y_max]) => Self {
                x_min,
                y_min,
                x_max,
                y_max,
            },
        }
    }
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// 非空且落在图像范围内
    pub fn is_within(&self, image_width: u32, image_height: u32) -> bool {
        self.x_max > self.x_min
            && self.y_max > self.y_min
            && self.x_max <= image_width
            && self.y_max <= image_height
    }
}

/// 已知的检测类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    Emotion,
    Action,
    Pose,
    Expression,
    Clothing,
    Activity,
}

impl DetectionKind {
    pub const ALL: [DetectionKind; 6] = [
        DetectionKind::Emotion,
        DetectionKind::Action,
        DetectionKind::Pose,
        DetectionKind::Expression,
        DetectionKind::Clothing,
        DetectionKind::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Emotion => "emotion",
            DetectionKind::Action => "action",
            DetectionKind::Pose => "pose",
            DetectionKind::Expression => "expression",
            DetectionKind::Clothing => "clothing",
            DetectionKind::Activity => "activity",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(key))
    }
}

/// 一个类别标签及其置信度
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionLabel {
    pub kind: DetectionKind,
    pub value: String,
    pub confidence: Option<f64>,
}

/// 单人分析结果
///
/// 已知类别解析为 `labels`，其余字段原样保留在 `extra`，
/// 序列化时还原为同一个 JSON 对象
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct AnalysisResult {
    pub labels: Vec<DetectionLabel>,
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    /// 置信度最高的标签，缺省置信度按 0 处理
    pub fn primary_label(&self) -> Option<&DetectionLabel> {
        self.labels.iter().fold(None, |best, label| match best {
            Some(current) if score(current) >= score(label) => Some(current),
            _ => Some(label),
        })
    }

    pub fn label(&self, kind: DetectionKind) -> Option<&DetectionLabel> {
        self.labels.iter().find(|l| l.kind == kind)
    }
}

fn score(label: &DetectionLabel) -> f64 {
    label.confidence.unwrap_or(0.0)
}

impl From<Map<String, Value>> for AnalysisResult {
    fn from(map: Map<String, Value>) -> Self {
        let shared_confidence = map.get("confidence").and_then(Value::as_f64);
        let mut labels = Vec::new();
        let mut extra = Map::new();

        for (key, value) in map.iter() {
            match (DetectionKind::from_key(key), value.as_str()) {
                (Some(kind), Some(text)) => {
                    let confidence = map
                        .get(&format!("{}_confidence", key))
                        .and_then(Value::as_f64)
                        .or(shared_confidence);
                    labels.push(DetectionLabel {
                        kind,
                        value: text.to_string(),
                        confidence,
                    });
                }
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }

        labels.sort_by_key(|l| l.kind);
        Self { labels, extra }
    }
}

impl From<AnalysisResult> for Map<String, Value> {
    fn from(result: AnalysisResult) -> Self {
        let mut map = result.extra;
        for label in result.labels {
            map.insert(label.kind.as_str().to_string(), Value::String(label.value));
        }
        map
    }
}
