use crate::model::{Comparison, MetricDefinition, MetricStatus};

/// 警告区间系数：大于/小于类比较在阈值的 90% 处进入警告
pub const WARNING_RATIO: f64 = 0.9;

/// 等值比较的警告容差（阈值的 20%）
pub const EQUAL_TOLERANCE_RATIO: f64 = 0.2;

/// 阈值规则
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    threshold: f64,
    comparison: Comparison,
    triggered_status: MetricStatus,
}

impl ThresholdRule {
    pub fn new(threshold: f64, comparison: Comparison, triggered_status: MetricStatus) -> Self {
        Self {
            threshold,
            comparison,
            triggered_status,
        }
    }

    pub fn from_definition(def: &MetricDefinition) -> Self {
        Self::new(def.threshold, def.comparison.clone(), def.triggered_status.clone())
    }

    /// 是否满足阈值条件
    pub fn is_triggered(&self, value: f64) -> bool {
        let t = self.threshold;
        match self.comparison {
            Comparison::Greater => value > t,
            Comparison::GreaterEqual => value >= t,
            Comparison::Less => value < t,
            Comparison::LessEqual => value <= t,
            Comparison::Equal => value == t,
            Comparison::Other(_) => false,
        }
    }

    /// 是否接近阈值
    pub fn is_near(&self, value: f64) -> bool {
        let t = self.threshold;
        match self.comparison {
            Comparison::Greater | Comparison::GreaterEqual => value >= t * WARNING_RATIO,
            Comparison::Less | Comparison::LessEqual => value <= t * WARNING_RATIO,
            Comparison::Equal => (value - t).abs() <= t * EQUAL_TOLERANCE_RATIO,
            Comparison::Other(_) => false,
        }
    }

    /// 计算指标状态
    ///
    /// 1. 满足阈值条件 -> 配置的触发状态
    /// 2. 接近阈值 -> warning
    /// 3. 否则触发状态为 critical 时返回 normal，其余情况返回 critical
    pub fn classify(&self, value: f64) -> MetricStatus {
        if self.is_triggered(value) {
            return self.triggered_status.clone();
        }

        if self.is_near(value) {
            return MetricStatus::Warning;
        }

        if self.triggered_status == MetricStatus::Critical {
            MetricStatus::Normal
        } else {
            MetricStatus::Critical
        }
    }
}

/// 按阈值规则计算指标状态
pub fn classify(
    value: f64,
    threshold: f64,
    comparison: Comparison,
    triggered_status: &MetricStatus,
) -> MetricStatus {
    ThresholdRule::new(threshold, comparison, triggered_status.clone()).classify(value)
}
