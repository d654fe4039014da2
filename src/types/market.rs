use serde::{Deserialize, Serialize};

/// One row of `/market/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPoint {
    pub time: String,
    pub close: f64,
    pub volume: f64,
    /// Indicators are null until enough history exists
    #[serde(default)]
    pub rsi: Option<f64>,
    #[serde(default)]
    pub macd: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueAxis {
    Price,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SeriesKind {
    Line { smooth: bool },
    Bar { opacity: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: &'static str,
    pub kind: SeriesKind,
    pub axis: ValueAxis,
    pub data: Vec<Option<f64>>,
}

/// Parallel series over one shared time axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub times: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSeries {
    pub fn from_points(points: &[MarketPoint]) -> Self {
        let times = points.iter().map(|p| p.time.clone()).collect();

        let series = vec![
            Series {
                name: "Price",
                kind: SeriesKind::Line { smooth: true },
                axis: ValueAxis::Price,
                data: points.iter().map(|p| Some(p.close)).collect(),
            },
            Series {
                name: "Volume",
                kind: SeriesKind::Bar { opacity: 0.5 },
                axis: ValueAxis::Volume,
                data: points.iter().map(|p| Some(p.volume)).collect(),
            },
            Series {
                name: "RSI",
                kind: SeriesKind::Line { smooth: true },
                axis: ValueAxis::Price,
                data: points.iter().map(|p| p.rsi).collect(),
            },
            Series {
                name: "MACD",
                kind: SeriesKind::Line { smooth: true },
                axis: ValueAxis::Price,
                data: points.iter().map(|p| p.macd).collect(),
            },
        ];

        Self { times, series }
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
